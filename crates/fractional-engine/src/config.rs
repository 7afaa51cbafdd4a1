//! Engine configuration

use fractional_types::{AccountId, Wei};
use serde::{Deserialize, Serialize};

/// Configuration established at engine initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// The administrative role; the only account allowed to change the
    /// withdrawal threshold at runtime
    pub admin: AccountId,
    /// Minimum accumulated proceeds before a withdrawal is accepted
    pub min_withdraw_wei: Wei,
}

impl MarketplaceConfig {
    /// Config with no withdrawal threshold
    pub fn new(admin: AccountId) -> Self {
        Self {
            admin,
            min_withdraw_wei: Wei::zero(),
        }
    }

    /// Set the initial withdrawal threshold
    pub fn with_min_withdraw(mut self, min: Wei) -> Self {
        self.min_withdraw_wei = min;
        self
    }
}
