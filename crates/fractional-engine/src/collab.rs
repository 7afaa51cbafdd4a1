//! External collaborator interfaces
//!
//! The engine coordinates two token contracts and a native-value payout
//! rail. Their implementations are out of scope; these traits specify
//! exactly the surface the core needs and nothing more.

use fractional_types::{AccountId, ContractRef, Result, TokenNo, TokenUid, Wei};

/// The non-fungible asset contract holding the assets taken into custody
#[async_trait::async_trait]
pub trait NftContract: Send + Sync {
    /// Current owner of an asset
    async fn owner_of(&self, contract: &ContractRef, token_no: TokenNo) -> Result<AccountId>;

    /// Whether `operator` holds blanket transfer approval from `owner`
    async fn is_approved_for_all(&self, owner: &AccountId, operator: &AccountId) -> Result<bool>;

    /// Move custody of an asset
    async fn transfer(
        &self,
        contract: &ContractRef,
        from: &AccountId,
        to: &AccountId,
        token_no: TokenNo,
    ) -> Result<()>;
}

/// The fungible share collaborator, one logical token contract per
/// fractionalized asset, keyed by canonical uid
#[async_trait::async_trait]
pub trait ShareVault: Send + Sync {
    /// Create a fresh share supply owned by `owner`, granting `operator` a
    /// blanket allowance over it. Returns the share contract reference.
    async fn create_shares(
        &self,
        uid: TokenUid,
        name: &str,
        symbol: &str,
        owner: &AccountId,
        operator: &AccountId,
        supply: u64,
    ) -> Result<ContractRef>;

    /// Allowance-based transfer executed by `operator` on behalf of `from`
    async fn transfer_from(
        &self,
        uid: TokenUid,
        operator: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<()>;

    /// Allowance-based burn executed by `operator` against `holder`
    async fn burn_from(
        &self,
        uid: TokenUid,
        operator: &AccountId,
        holder: &AccountId,
        amount: u64,
    ) -> Result<()>;

    /// Share balance of an account for one fractionalized asset
    async fn balance_of(&self, uid: TokenUid, account: &AccountId) -> Result<u64>;
}

/// Native-value payout rail, used only by profit withdrawal
#[async_trait::async_trait]
pub trait PaymentRail: Send + Sync {
    /// Pay out accumulated proceeds. Invoked strictly after the escrow
    /// balance has been zeroed.
    async fn pay_out(&self, to: &AccountId, amount: Wei) -> Result<()>;
}
