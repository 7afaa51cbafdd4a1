//! Per-buyer holding entries

use crate::{AccountId, TokenUid};
use serde::{Deserialize, Serialize};

/// One buyer's position in one fractionalized asset
///
/// At most one entry exists per (buyer, uid) pair at any time; repeat
/// purchases merge into the existing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingEntry {
    pub buyer: AccountId,
    pub token_uid: TokenUid,
    pub shares_owned: u64,
}

impl HoldingEntry {
    pub fn new(buyer: AccountId, token_uid: TokenUid, shares_owned: u64) -> Self {
        Self {
            buyer,
            token_uid,
            shares_owned,
        }
    }
}
