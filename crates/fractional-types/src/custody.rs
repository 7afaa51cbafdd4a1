//! Custody records and the per-asset sale state machine
//!
//! A `CustodyRecord` is created when an asset is deposited and deleted when
//! the asset is bought back. The custody ledger owns the business fields; the
//! listing registry owns the link pointers (it never appears here).

use crate::{AccountId, ContractRef, FractionalError, Result, TokenNo, TokenUid, Wei};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived lifecycle state of a custodied asset
///
/// `Deposited -> Fractionalized -> ForSale -> SoldOut`, with the record
/// removed entirely on buy-back. A price update while listed is not
/// supported; a fresh `sell` is only possible when not currently for sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleStatus {
    /// In custody, no fraction supply issued yet
    Deposited,
    /// Fraction supply issued, not listed
    Fractionalized,
    /// Listed at a fixed per-fraction price
    ForSale,
    /// Full supply sold; awaiting buy-back
    SoldOut,
}

/// Bookkeeping record for one custodied asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyRecord {
    /// The depositor; retains economic rights until fully sold
    pub owner: AccountId,
    /// Origin contract of the asset
    pub contract_ref: ContractRef,
    /// Numeric id of the asset within its origin contract
    pub token_no: TokenNo,
    /// Total fraction supply issued at fractionalization (0 until then)
    pub fractions_total_supply: u64,
    /// Fractions still purchasable
    pub available_fractions: u64,
    /// Fixed seller-set price per fraction
    pub price_per_fraction: Wei,
    /// Currently listed in the registry
    pub for_sale: bool,
    /// Full supply sold
    pub sold_out: bool,
    /// Reference to the fungible share contract, set at fractionalization
    pub fractions_contract: Option<ContractRef>,
    /// Deposit time
    pub created_at: DateTime<Utc>,
}

impl CustodyRecord {
    /// Create a fresh record at deposit time: no supply, not for sale
    pub fn new(owner: AccountId, contract_ref: ContractRef, token_no: TokenNo) -> Self {
        Self {
            owner,
            contract_ref,
            token_no,
            fractions_total_supply: 0,
            available_fractions: 0,
            price_per_fraction: Wei::zero(),
            for_sale: false,
            sold_out: false,
            fractions_contract: None,
            created_at: Utc::now(),
        }
    }

    /// Whether a fraction supply has been issued
    pub fn is_fractionalized(&self) -> bool {
        self.fractions_total_supply > 0
    }

    /// Derived lifecycle state
    pub fn status(&self) -> SaleStatus {
        if self.sold_out {
            SaleStatus::SoldOut
        } else if self.for_sale {
            SaleStatus::ForSale
        } else if self.is_fractionalized() {
            SaleStatus::Fractionalized
        } else {
            SaleStatus::Deposited
        }
    }

    /// Record the issued fraction supply and the share contract backing it
    pub fn set_fractionalized(&mut self, supply: u64, fractions_contract: ContractRef) {
        self.fractions_total_supply = supply;
        self.available_fractions = supply;
        self.fractions_contract = Some(fractions_contract);
    }

    /// Flip the record into the for-sale state at a fixed price
    pub fn set_for_sale(&mut self, price_per_fraction: Wei) {
        self.price_per_fraction = price_per_fraction;
        self.for_sale = true;
    }

    /// Consume `amount` of the available supply; flips to sold-out at zero.
    /// Returns true when the sale exhausted the supply.
    pub fn consume_fractions(&mut self, token_uid: TokenUid, amount: u64) -> Result<bool> {
        if amount > self.available_fractions {
            return Err(FractionalError::InsufficientFractions {
                token_uid,
                requested: amount,
                available: self.available_fractions,
            });
        }
        self.available_fractions -= amount;
        if self.available_fractions == 0 {
            self.sold_out = true;
            self.for_sale = false;
            return Ok(true);
        }
        Ok(false)
    }
}
