//! Error types for the fractionalization marketplace
//!
//! All failures are explicit, synchronous, typed rejections. Each variant
//! names its kind and the offending identifier; the triggering operation
//! aborts with no partial state left behind. Retry policy, if any, belongs
//! to the caller.

use crate::{AccountId, TokenUid, Wei};
use thiserror::Error;

/// Result type for marketplace operations
pub type Result<T> = std::result::Result<T, FractionalError>;

/// Marketplace error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FractionalError {
    // ========================================================================
    // Custody Errors
    // ========================================================================

    /// Caller does not own or control the asset
    #[error("Account {account} is not the owner of token {token_uid}")]
    NotOwner { account: AccountId, token_uid: TokenUid },

    /// Depositor has not granted blanket approval to the engine
    #[error("Account {account} has not approved the engine as operator")]
    NotApproved { account: AccountId },

    /// A custody record already exists for this uid
    #[error("Token {token_uid} is already deposited")]
    AlreadyDeposited { token_uid: TokenUid },

    /// No custody record exists for this uid
    #[error("Token {token_uid} not found")]
    TokenNotFound { token_uid: TokenUid },

    // ========================================================================
    // Fractionalization Errors
    // ========================================================================

    /// A record may not be fractionalized twice
    #[error("Token {token_uid} is already fractionalized")]
    AlreadyFractionalized { token_uid: TokenUid },

    /// Sell requires a fractionalized record
    #[error("Token {token_uid} is not fractionalized")]
    NotFractionalized { token_uid: TokenUid },

    /// Fraction supplies and purchase amounts must be non-zero
    #[error("Invalid fraction amount for token {token_uid}: {supply}")]
    InvalidSupply { token_uid: TokenUid, supply: u64 },

    // ========================================================================
    // Sale Errors
    // ========================================================================

    /// The record is already listed for sale
    #[error("Token {token_uid} is already for sale")]
    AlreadyForSale { token_uid: TokenUid },

    /// The record's full supply has already been sold
    #[error("Token {token_uid} is already sold out")]
    AlreadySoldOut { token_uid: TokenUid },

    /// The record is not currently listed
    #[error("Token {token_uid} is not for sale")]
    NotForSale { token_uid: TokenUid },

    /// Self-trading is forbidden
    #[error("Account {account} cannot buy fractions of its own token {token_uid}")]
    CannotBuyOwnFractions { account: AccountId, token_uid: TokenUid },

    /// Requested amount exceeds the available supply
    #[error("Token {token_uid} has {available} fractions available, requested {requested}")]
    InsufficientFractions {
        token_uid: TokenUid,
        requested: u64,
        available: u64,
    },

    /// Payment does not cover amount * price
    #[error("Insufficient payment for token {token_uid}: required {required}, provided {provided}")]
    InsufficientPayment {
        token_uid: TokenUid,
        required: Wei,
        provided: Wei,
    },

    // ========================================================================
    // Buy-back Errors
    // ========================================================================

    /// Buy-back requires 100% of the outstanding share supply
    #[error("Account {account} holds {held} of {total} fractions of token {token_uid}")]
    IncompleteOwnership {
        account: AccountId,
        token_uid: TokenUid,
        held: u64,
        total: u64,
    },

    // ========================================================================
    // Share Collaborator Errors
    // ========================================================================

    /// Share balance too low for a transfer or burn
    #[error("Account {account} has {available} shares of token {token_uid}, needs {requested}")]
    InsufficientShares {
        account: AccountId,
        token_uid: TokenUid,
        requested: u64,
        available: u64,
    },

    /// The engine has no allowance to move this holder's shares
    #[error("Account {account} has not granted the engine an allowance for token {token_uid}")]
    InsufficientAllowance { account: AccountId, token_uid: TokenUid },

    // ========================================================================
    // Escrow & Withdrawal Errors
    // ========================================================================

    /// Accumulated proceeds are below the configured minimum
    #[error("Balance {balance} is below the minimum withdrawal of {minimum}")]
    BelowMinimumWithdrawal { balance: Wei, minimum: Wei },

    /// External payout rejected the transfer
    #[error("Payout of {amount} to {account} failed: {reason}")]
    PaymentFailed {
        account: AccountId,
        amount: Wei,
        reason: String,
    },

    // ========================================================================
    // Holdings Errors
    // ========================================================================

    /// Expected share balance did not match the stored entry (stale caller)
    #[error("Holdings mismatch for token {token_uid}: expected {expected}, found {actual}")]
    HoldingsMismatch {
        token_uid: TokenUid,
        expected: u64,
        actual: u64,
    },

    // ========================================================================
    // General Errors
    // ========================================================================

    /// Caller lacks the required privilege
    #[error("Account {account} is not authorized for this operation")]
    NotAuthorized { account: AccountId },

    /// Arithmetic overflow during amount math
    #[error("Amount overflow during arithmetic operation")]
    AmountOverflow,
}

impl FractionalError {
    /// Get a stable error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotOwner { .. } => "NOT_OWNER",
            Self::NotApproved { .. } => "NOT_APPROVED",
            Self::AlreadyDeposited { .. } => "ALREADY_DEPOSITED",
            Self::TokenNotFound { .. } => "TOKEN_NOT_FOUND",
            Self::AlreadyFractionalized { .. } => "ALREADY_FRACTIONALIZED",
            Self::NotFractionalized { .. } => "NOT_FRACTIONALIZED",
            Self::InvalidSupply { .. } => "INVALID_SUPPLY",
            Self::AlreadyForSale { .. } => "ALREADY_FOR_SALE",
            Self::AlreadySoldOut { .. } => "ALREADY_SOLD_OUT",
            Self::NotForSale { .. } => "NOT_FOR_SALE",
            Self::CannotBuyOwnFractions { .. } => "CANNOT_BUY_OWN_FRACTIONS",
            Self::InsufficientFractions { .. } => "INSUFFICIENT_FRACTIONS",
            Self::InsufficientPayment { .. } => "INSUFFICIENT_PAYMENT",
            Self::IncompleteOwnership { .. } => "INCOMPLETE_OWNERSHIP",
            Self::InsufficientShares { .. } => "INSUFFICIENT_SHARES",
            Self::InsufficientAllowance { .. } => "INSUFFICIENT_ALLOWANCE",
            Self::BelowMinimumWithdrawal { .. } => "BELOW_MINIMUM_WITHDRAWAL",
            Self::PaymentFailed { .. } => "PAYMENT_FAILED",
            Self::HoldingsMismatch { .. } => "HOLDINGS_MISMATCH",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = FractionalError::BelowMinimumWithdrawal {
            balance: Wei::new(5),
            minimum: Wei::new(10),
        };
        assert_eq!(err.error_code(), "BELOW_MINIMUM_WITHDRAWAL");
    }

    #[test]
    fn test_error_names_offending_identifier() {
        let account = AccountId::new();
        let err = FractionalError::NotAuthorized {
            account: account.clone(),
        };
        assert!(err.to_string().contains(&account.to_string()));
    }
}
