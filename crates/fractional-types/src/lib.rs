//! Fractional Types - Canonical domain types for the fractionalization
//! marketplace
//!
//! This crate contains all foundational types with zero dependencies on other
//! fractional crates. It defines:
//!
//! - Identity types (AccountId, ContractRef, TokenNo)
//! - The canonical token identifier and its resolver (TokenUid)
//! - Wei amounts with overflow-checked arithmetic
//! - Custody records and the per-asset sale state machine
//! - Per-buyer holding entries
//! - The complete error taxonomy
//!
//! # Architectural Invariants
//!
//! These types support the core marketplace invariants:
//!
//! 1. `available_fractions <= fractions_total_supply` at all times
//! 2. `for_sale` and `sold_out` are mutually exclusive
//! 3. A custody record is fractionalized at most once
//! 4. Failure is explicit: every rejection names its kind and the offending
//!    identifier

pub mod canonical;
pub mod custody;
pub mod error;
pub mod holding;
pub mod identity;
pub mod wei;

pub use canonical::*;
pub use custody::*;
pub use error::*;
pub use holding::*;
pub use identity::*;
pub use wei::*;

/// Version of the fractional types schema
pub const TYPES_VERSION: &str = "0.1.0";
