//! Wei amounts with overflow-checked arithmetic
//!
//! All marketplace value is denominated in wei, the smallest native unit.
//! Arithmetic is checked: overflow surfaces as an explicit error instead of
//! wrapping, and subtraction below zero is impossible by construction (u128).

use crate::{FractionalError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wei per whole native unit (18 decimals)
pub const WEI_PER_UNIT: u128 = 1_000_000_000_000_000_000;

/// A non-negative amount of native currency, in wei
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Wei(pub u128);

impl Wei {
    /// Create an amount from raw wei
    pub fn new(value: u128) -> Self {
        Self(value)
    }

    /// Create a zero amount
    pub fn zero() -> Self {
        Self(0)
    }

    /// Create an amount from whole native units
    pub fn from_units(units: u128) -> Result<Self> {
        units
            .checked_mul(WEI_PER_UNIT)
            .map(Self)
            .ok_or(FractionalError::AmountOverflow)
    }

    /// Check if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(FractionalError::AmountOverflow)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(FractionalError::AmountOverflow)
    }

    /// Checked multiplication by a share count, used for price * amount
    pub fn checked_mul(self, count: u64) -> Result<Self> {
        self.0
            .checked_mul(count as u128)
            .map(Self)
            .ok_or(FractionalError::AmountOverflow)
    }
}

impl From<u128> for Wei {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}
