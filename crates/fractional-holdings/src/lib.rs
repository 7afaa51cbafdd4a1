//! Fractional Holdings - the per-buyer holdings ledger
//!
//! Each buyer's positions live in a slot-recycling arena: a dense array of
//! optional entries, a stack of freed indices, and a uid-to-slot index map so
//! lookups never scan. Deleting an entry frees exactly one slot; the next
//! insertion reuses a freed slot before the backing array grows. Delete and
//! insert churn therefore never leaks backing-store growth.
//!
//! # Invariants
//!
//! 1. At most one entry per (buyer, uid) pair
//! 2. Backing size == live entries + free-list length
//! 3. Freed slots are invisible to enumeration but eligible for reuse

use fractional_types::{AccountId, FractionalError, HoldingEntry, Result, TokenUid};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One buyer's slot-recycling position book
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct HoldingBook {
    /// Dense backing store; `None` marks a recyclable slot
    slots: Vec<Option<HoldingEntry>>,
    /// Freed indices, reused LIFO
    free: Vec<usize>,
    /// uid -> slot, to avoid linear scans
    index: HashMap<TokenUid, usize>,
}

impl HoldingBook {
    fn store(&mut self, buyer: &AccountId, uid: TokenUid, delta_shares: u64) {
        if let Some(&slot) = self.index.get(&uid) {
            if let Some(entry) = self.slots[slot].as_mut() {
                entry.shares_owned += delta_shares;
                return;
            }
        }

        let entry = HoldingEntry::new(buyer.clone(), uid, delta_shares);
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                self.index.insert(uid, slot);
            }
            None => {
                self.slots.push(Some(entry));
                self.index.insert(uid, self.slots.len() - 1);
            }
        }
    }

    fn delete(&mut self, uid: &TokenUid, expected_shares: u64) -> Result<HoldingEntry> {
        let slot = *self
            .index
            .get(uid)
            .ok_or(FractionalError::TokenNotFound { token_uid: *uid })?;

        let entry = match self.slots[slot].take() {
            Some(entry) => entry,
            None => return Err(FractionalError::TokenNotFound { token_uid: *uid }),
        };
        if entry.shares_owned != expected_shares {
            let actual = entry.shares_owned;
            // Rejected delete leaves the entry in place
            self.slots[slot] = Some(entry);
            return Err(FractionalError::HoldingsMismatch {
                token_uid: *uid,
                expected: expected_shares,
                actual,
            });
        }

        self.index.remove(uid);
        // The slot stays in place; only its contents are vacated
        self.free.push(slot);
        Ok(entry)
    }

    fn entries(&self) -> Vec<HoldingEntry> {
        self.slots.iter().flatten().cloned().collect()
    }

    fn shares_of(&self, uid: &TokenUid) -> u64 {
        self.index
            .get(uid)
            .and_then(|&slot| self.slots[slot].as_ref())
            .map(|e| e.shares_owned)
            .unwrap_or(0)
    }
}

/// The holdings ledger, one book per buyer
#[derive(Debug, Default)]
pub struct HoldingsLedger {
    books: HashMap<AccountId, HoldingBook>,
}

impl HoldingsLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            books: HashMap::new(),
        }
    }

    /// Record a purchase: merge into the buyer's existing entry for this uid,
    /// or write a new entry into a recycled (or fresh) slot.
    pub fn store(&mut self, buyer: &AccountId, uid: TokenUid, delta_shares: u64) {
        self.books
            .entry(buyer.clone())
            .or_default()
            .store(buyer, uid, delta_shares);
    }

    /// Remove a buyer's entry for a uid and free its slot.
    ///
    /// `authorized` restricts who may force-delete another buyer's entry:
    /// a caller may always delete their own, anyone else must appear in the
    /// list. `expected_shares` must match the stored balance, rejecting
    /// stale callers.
    pub fn delete(
        &mut self,
        authorized: &[AccountId],
        caller: &AccountId,
        buyer: &AccountId,
        uid: &TokenUid,
        expected_shares: u64,
    ) -> Result<HoldingEntry> {
        if caller != buyer && !authorized.contains(caller) {
            return Err(FractionalError::NotAuthorized {
                account: caller.clone(),
            });
        }
        self.books
            .get_mut(buyer)
            .ok_or(FractionalError::TokenNotFound { token_uid: *uid })?
            .delete(uid, expected_shares)
    }

    /// All live entries for a buyer, in slot order. Order carries no meaning
    /// beyond being stable between mutations.
    pub fn list_for(&self, buyer: &AccountId) -> Vec<HoldingEntry> {
        self.books
            .get(buyer)
            .map(|book| book.entries())
            .unwrap_or_default()
    }

    /// The buyer's recorded share balance for a uid (0 when absent)
    pub fn shares_of(&self, buyer: &AccountId, uid: &TokenUid) -> u64 {
        self.books
            .get(buyer)
            .map(|book| book.shares_of(uid))
            .unwrap_or(0)
    }

    /// Backing-store size for a buyer (live entries + free slots).
    /// Exposed for the no-leaked-growth invariant checks.
    pub fn backing_len(&self, buyer: &AccountId) -> usize {
        self.books
            .get(buyer)
            .map(|book| book.slots.len())
            .unwrap_or(0)
    }
}
