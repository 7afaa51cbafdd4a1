//! Fractional Custody - the custody ledger
//!
//! Records which canonical uids are currently held in custody, by whom, and
//! their fractionalization/sale status. Keyed exclusively by `TokenUid`.
//!
//! # Invariants
//!
//! 1. At most one record per uid (`AlreadyDeposited` on duplicate insert)
//! 2. Records leave the ledger only through buy-back removal
//! 3. Access is serialized by the engine; the ledger itself holds no locks

use fractional_types::{AccountId, CustodyRecord, FractionalError, Result, TokenUid};
use std::collections::HashMap;

/// The custody ledger
///
/// Owned by a single engine instance. Every mutating operation re-validates
/// against this ledger at execution time, never against a cached snapshot.
#[derive(Debug, Default)]
pub struct CustodyLedger {
    records: HashMap<TokenUid, CustodyRecord>,
}

impl CustodyLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Insert a fresh record for a deposited asset
    pub fn insert(&mut self, uid: TokenUid, record: CustodyRecord) -> Result<()> {
        if self.records.contains_key(&uid) {
            return Err(FractionalError::AlreadyDeposited { token_uid: uid });
        }
        self.records.insert(uid, record);
        Ok(())
    }

    /// Look up a record
    pub fn get(&self, uid: &TokenUid) -> Result<&CustodyRecord> {
        self.records
            .get(uid)
            .ok_or(FractionalError::TokenNotFound { token_uid: *uid })
    }

    /// Look up a record for mutation
    pub fn get_mut(&mut self, uid: &TokenUid) -> Result<&mut CustodyRecord> {
        self.records
            .get_mut(uid)
            .ok_or(FractionalError::TokenNotFound { token_uid: *uid })
    }

    /// Whether a record exists for this uid
    pub fn contains(&self, uid: &TokenUid) -> bool {
        self.records.contains_key(uid)
    }

    /// Remove a record (buy-back)
    pub fn remove(&mut self, uid: &TokenUid) -> Result<CustodyRecord> {
        self.records
            .remove(uid)
            .ok_or(FractionalError::TokenNotFound { token_uid: *uid })
    }

    /// All records deposited by one owner, with their uids
    pub fn records_of(&self, owner: &AccountId) -> Vec<(TokenUid, CustodyRecord)> {
        self.records
            .iter()
            .filter(|(_, r)| &r.owner == owner)
            .map(|(uid, r)| (*uid, r.clone()))
            .collect()
    }

    /// Number of assets currently in custody
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
