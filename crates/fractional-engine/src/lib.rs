//! Fractional Engine - the marketplace orchestrator
//!
//! Coordinates the custody ledger, listing registry, holdings ledger, and
//! escrow ledger with the two external token collaborators:
//!
//! - `deposit` moves an asset into custody
//! - `fractionalize` issues a fungible share supply against it
//! - `sell` lists the shares at a fixed price
//! - `buy` moves shares to buyers against payment, escrowing the proceeds
//! - `buy_back_nft` redeems the asset for whoever holds 100% of the supply
//! - `withdraw_sales_profit` pays out escrowed proceeds past a threshold
//!
//! Operations execute as atomic, strictly serialized transactions: a single
//! lock around all marketplace state means one operation owns the whole data
//! structure for its duration.

pub mod collab;
pub mod config;
pub mod engine;
pub mod memory;

pub use collab::*;
pub use config::*;
pub use engine::*;
pub use memory::*;

pub use fractional_types::{
    AccountId, ContractRef, CustodyRecord, FractionalError, HoldingEntry, Result, SaleStatus,
    TokenNo, TokenUid, Wei,
};
