//! Canonical token identifier
//!
//! A `TokenUid` is the single key used across the custody ledger, the listing
//! registry, and the holdings ledger. It is derived deterministically from
//! the asset's origin contract reference and its numeric id, so external
//! callers can predict the uid of an asset before depositing it.

use crate::{ContractRef, TokenNo};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// Canonical identifier of a custodied asset
///
/// Keccak-256 over the origin contract reference bytes concatenated with the
/// big-endian token number. Collision-resistant, fixed-width, and injective
/// in practice over all (contract, token) pairs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TokenUid(pub [u8; 32]);

impl TokenUid {
    /// Derive the canonical uid for an asset. Pure, no side effects.
    pub fn resolve(contract: &ContractRef, token_no: TokenNo) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(contract.as_bytes());
        hasher.update(token_no.to_be_bytes());
        Self(hasher.finalize().into())
    }

    /// The raw 32-byte digest
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex rendering, used in error messages and logs
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TokenUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}
