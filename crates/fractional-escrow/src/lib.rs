//! Fractional Escrow - accumulated sale proceeds per seller
//!
//! Proceeds never move directly to sellers during a sale; every buy credits
//! the seller's escrow balance here, and sellers withdraw on their own
//! schedule once past the configured minimum. The withdrawal path zeroes the
//! balance before any external payout happens, which is what closes the
//! classic reentrancy window; `take` and `restore` exist so the engine can
//! keep that ordering and still compensate a failed payout.

use fractional_types::{AccountId, Result, Wei};
use std::collections::HashMap;

/// Per-seller accumulated, not-yet-withdrawn sale proceeds
#[derive(Debug, Default)]
pub struct EscrowLedger {
    balances: HashMap<AccountId, Wei>,
}

impl EscrowLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    /// Credit a seller with sale proceeds. Checked: overflow is an error and
    /// leaves the balance untouched.
    pub fn credit(&mut self, seller: &AccountId, amount: Wei) -> Result<Wei> {
        let current = self.balance_of(seller);
        let updated = current.checked_add(amount)?;
        self.balances.insert(seller.clone(), updated);
        Ok(updated)
    }

    /// A seller's current escrow balance (zero when absent)
    pub fn balance_of(&self, seller: &AccountId) -> Wei {
        self.balances.get(seller).copied().unwrap_or_default()
    }

    /// Zero a seller's balance and return the prior amount.
    ///
    /// Called by the withdrawal path strictly before the external payout.
    pub fn take(&mut self, seller: &AccountId) -> Wei {
        self.balances.remove(seller).unwrap_or_default()
    }

    /// Put a taken balance back, compensating a failed payout
    pub fn restore(&mut self, seller: &AccountId, amount: Wei) -> Result<Wei> {
        self.credit(seller, amount)
    }
}
