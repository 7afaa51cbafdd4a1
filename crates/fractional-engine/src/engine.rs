//! The marketplace engine
//!
//! A single engine instance owns all ledgers. Every operation takes the
//! write lock for its whole duration, so operations execute as strictly
//! serialized transactions: preconditions are re-validated against current
//! ledger state at execution time, never against a cached snapshot, and
//! ledger mutation happens only after the external collaborator calls have
//! succeeded, so a failing operation commits nothing.

use crate::collab::{NftContract, PaymentRail, ShareVault};
use crate::config::MarketplaceConfig;
use fractional_custody::CustodyLedger;
use fractional_escrow::EscrowLedger;
use fractional_holdings::HoldingsLedger;
use fractional_listing::ListingRegistry;
use fractional_types::{
    AccountId, ContractRef, CustodyRecord, FractionalError, HoldingEntry, Result, TokenNo,
    TokenUid, Wei,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// All mutable marketplace state, owned by one operation at a time
struct MarketState {
    custody: CustodyLedger,
    listings: ListingRegistry,
    holdings: HoldingsLedger,
    escrow: EscrowLedger,
    min_withdraw_wei: Wei,
}

/// The marketplace engine
pub struct Marketplace {
    /// The engine's own account: custodian of deposited assets and the
    /// operator the share vault acts on behalf of
    engine_account: AccountId,
    admin: AccountId,
    nft: Arc<dyn NftContract>,
    shares: Arc<dyn ShareVault>,
    payments: Arc<dyn PaymentRail>,
    state: RwLock<MarketState>,
}

impl Marketplace {
    /// Create an engine with explicit initialization and no implicit statics
    pub fn new(
        config: MarketplaceConfig,
        nft: Arc<dyn NftContract>,
        shares: Arc<dyn ShareVault>,
        payments: Arc<dyn PaymentRail>,
    ) -> Self {
        Self {
            engine_account: AccountId::new(),
            admin: config.admin,
            nft,
            shares,
            payments,
            state: RwLock::new(MarketState {
                custody: CustodyLedger::new(),
                listings: ListingRegistry::new(),
                holdings: HoldingsLedger::new(),
                escrow: EscrowLedger::new(),
                min_withdraw_wei: config.min_withdraw_wei,
            }),
        }
    }

    /// The engine's custody account. Depositors grant this account blanket
    /// approval on the asset contract before depositing.
    pub fn engine_account(&self) -> &AccountId {
        &self.engine_account
    }

    /// Predict the canonical uid of an asset before depositing it.
    /// Pure and read-only.
    pub fn unique_token_id(&self, contract: &ContractRef, token_no: TokenNo) -> TokenUid {
        TokenUid::resolve(contract, token_no)
    }

    // ========================================================================
    // Deposit / fractionalize / sell
    // ========================================================================

    /// Take an asset into custody and open a fresh custody record
    pub async fn deposit(
        &self,
        caller: &AccountId,
        contract: &ContractRef,
        token_no: TokenNo,
    ) -> Result<TokenUid> {
        let mut state = self.state.write().await;
        let uid = self.deposit_inner(&mut state, caller, contract, token_no).await?;
        info!(%uid, caller = %caller, "asset deposited");
        Ok(uid)
    }

    /// Issue the fungible share supply against a custodied asset
    pub async fn fractionalize(
        &self,
        caller: &AccountId,
        uid: TokenUid,
        total_supply: u64,
        name: &str,
        symbol: &str,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        self.fractionalize_inner(&mut state, caller, uid, total_supply, name, symbol)
            .await?;
        info!(%uid, supply = total_supply, "asset fractionalized");
        Ok(())
    }

    /// List a fractionalized asset at a fixed per-fraction price
    pub async fn sell(
        &self,
        caller: &AccountId,
        uid: TokenUid,
        price_per_fraction: Wei,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        self.sell_inner(&mut state, caller, uid, price_per_fraction)?;
        info!(%uid, price = %price_per_fraction, "asset listed for sale");
        Ok(())
    }

    /// Deposit, fractionalize, and list in one serialized transaction
    pub async fn deposit_fractionalize_sell(
        &self,
        caller: &AccountId,
        contract: &ContractRef,
        token_no: TokenNo,
        total_supply: u64,
        name: &str,
        symbol: &str,
        price_per_fraction: Wei,
    ) -> Result<TokenUid> {
        // Validate the later steps' one standalone precondition up front, so
        // a doomed composite does not leave the deposit committed
        if total_supply == 0 {
            return Err(FractionalError::InvalidSupply {
                token_uid: TokenUid::resolve(contract, token_no),
                supply: total_supply,
            });
        }

        let mut state = self.state.write().await;
        let uid = self.deposit_inner(&mut state, caller, contract, token_no).await?;
        self.fractionalize_inner(&mut state, caller, uid, total_supply, name, symbol)
            .await?;
        self.sell_inner(&mut state, caller, uid, price_per_fraction)?;
        info!(%uid, supply = total_supply, price = %price_per_fraction,
            "asset deposited, fractionalized, and listed");
        Ok(uid)
    }

    /// Fractionalize and list an already-deposited asset in one transaction
    pub async fn fractionalize_sell(
        &self,
        caller: &AccountId,
        uid: TokenUid,
        total_supply: u64,
        name: &str,
        symbol: &str,
        price_per_fraction: Wei,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        self.fractionalize_inner(&mut state, caller, uid, total_supply, name, symbol)
            .await?;
        self.sell_inner(&mut state, caller, uid, price_per_fraction)?;
        info!(%uid, supply = total_supply, price = %price_per_fraction,
            "asset fractionalized and listed");
        Ok(())
    }

    async fn deposit_inner(
        &self,
        state: &mut MarketState,
        caller: &AccountId,
        contract: &ContractRef,
        token_no: TokenNo,
    ) -> Result<TokenUid> {
        let uid = TokenUid::resolve(contract, token_no);
        if state.custody.contains(&uid) {
            return Err(FractionalError::AlreadyDeposited { token_uid: uid });
        }

        let owner = self.nft.owner_of(contract, token_no).await?;
        if &owner != caller {
            return Err(FractionalError::NotOwner {
                account: caller.clone(),
                token_uid: uid,
            });
        }
        if !self
            .nft
            .is_approved_for_all(caller, &self.engine_account)
            .await?
        {
            return Err(FractionalError::NotApproved {
                account: caller.clone(),
            });
        }

        self.nft
            .transfer(contract, caller, &self.engine_account, token_no)
            .await?;
        state
            .custody
            .insert(uid, CustodyRecord::new(caller.clone(), contract.clone(), token_no))?;
        Ok(uid)
    }

    async fn fractionalize_inner(
        &self,
        state: &mut MarketState,
        caller: &AccountId,
        uid: TokenUid,
        total_supply: u64,
        name: &str,
        symbol: &str,
    ) -> Result<()> {
        {
            let record = state.custody.get(&uid)?;
            if &record.owner != caller {
                return Err(FractionalError::NotOwner {
                    account: caller.clone(),
                    token_uid: uid,
                });
            }
            if record.is_fractionalized() {
                return Err(FractionalError::AlreadyFractionalized { token_uid: uid });
            }
        }
        if total_supply == 0 {
            return Err(FractionalError::InvalidSupply {
                token_uid: uid,
                supply: total_supply,
            });
        }

        let fractions_contract = self
            .shares
            .create_shares(uid, name, symbol, caller, &self.engine_account, total_supply)
            .await?;
        state
            .custody
            .get_mut(&uid)?
            .set_fractionalized(total_supply, fractions_contract);
        Ok(())
    }

    fn sell_inner(
        &self,
        state: &mut MarketState,
        caller: &AccountId,
        uid: TokenUid,
        price_per_fraction: Wei,
    ) -> Result<()> {
        let record = state.custody.get_mut(&uid)?;
        if &record.owner != caller {
            return Err(FractionalError::NotOwner {
                account: caller.clone(),
                token_uid: uid,
            });
        }
        if !record.is_fractionalized() {
            return Err(FractionalError::NotFractionalized { token_uid: uid });
        }
        if record.sold_out {
            return Err(FractionalError::AlreadySoldOut { token_uid: uid });
        }
        if record.for_sale {
            return Err(FractionalError::AlreadyForSale { token_uid: uid });
        }

        record.set_for_sale(price_per_fraction);
        state.listings.insert(uid)
    }

    // ========================================================================
    // Buy / buy-back / withdraw
    // ========================================================================

    /// Buy fractions of a listed asset
    ///
    /// Payment must cover `amount * price`; any overpayment is accepted and
    /// credited to the seller in full rather than refunded.
    pub async fn buy(
        &self,
        caller: &AccountId,
        uid: TokenUid,
        amount: u64,
        payment_wei: Wei,
    ) -> Result<()> {
        // A zero-amount buy would pass every balance check and write a
        // permanent zero-share holdings entry
        if amount == 0 {
            return Err(FractionalError::InvalidSupply {
                token_uid: uid,
                supply: amount,
            });
        }

        let mut state = self.state.write().await;

        let (seller, required) = {
            let record = state.custody.get(&uid)?;
            if !record.for_sale {
                return Err(FractionalError::NotForSale { token_uid: uid });
            }
            if &record.owner == caller {
                return Err(FractionalError::CannotBuyOwnFractions {
                    account: caller.clone(),
                    token_uid: uid,
                });
            }
            if amount > record.available_fractions {
                return Err(FractionalError::InsufficientFractions {
                    token_uid: uid,
                    requested: amount,
                    available: record.available_fractions,
                });
            }
            let required = record.price_per_fraction.checked_mul(amount)?;
            (record.owner.clone(), required)
        };
        if payment_wei < required {
            return Err(FractionalError::InsufficientPayment {
                token_uid: uid,
                required,
                provided: payment_wei,
            });
        }
        // Make sure the escrow credit cannot fail after the share transfer
        state.escrow.balance_of(&seller).checked_add(payment_wei)?;

        self.shares
            .transfer_from(uid, &self.engine_account, &seller, caller, amount)
            .await?;

        let exhausted = state.custody.get_mut(&uid)?.consume_fractions(uid, amount)?;
        state.holdings.store(caller, uid, amount);
        state.escrow.credit(&seller, payment_wei)?;
        if exhausted {
            state.listings.remove(&uid);
            info!(%uid, "full supply sold, listing removed");
        }
        debug!(%uid, buyer = %caller, amount, payment = %payment_wei, "fractions bought");
        Ok(())
    }

    /// Redeem the original asset by burning 100% of its share supply
    pub async fn buy_back_nft(&self, caller: &AccountId, uid: TokenUid) -> Result<()> {
        let mut state = self.state.write().await;

        let (contract, token_no, total) = {
            let record = state.custody.get(&uid)?;
            if !record.is_fractionalized() {
                return Err(FractionalError::NotFractionalized { token_uid: uid });
            }
            (
                record.contract_ref.clone(),
                record.token_no,
                record.fractions_total_supply,
            )
        };

        let held = self.shares.balance_of(uid, caller).await?;
        if held != total {
            return Err(FractionalError::IncompleteOwnership {
                account: caller.clone(),
                token_uid: uid,
                held,
                total,
            });
        }

        // Burn requires the caller to have pre-authorized the engine
        self.shares
            .burn_from(uid, &self.engine_account, caller, total)
            .await?;
        self.nft
            .transfer(&contract, &self.engine_account, caller, token_no)
            .await?;

        state.custody.remove(&uid)?;
        let recorded = state.holdings.shares_of(caller, &uid);
        if recorded > 0 {
            state
                .holdings
                .delete(&[self.engine_account.clone()], caller, caller, &uid, recorded)?;
        }
        state.listings.remove(&uid);
        info!(%uid, caller = %caller, "asset bought back, custody returned");
        Ok(())
    }

    /// Withdraw accumulated sale proceeds
    ///
    /// The escrow balance is zeroed before the external payout runs; a
    /// rejected payout restores the balance and surfaces the failure.
    pub async fn withdraw_sales_profit(&self, caller: &AccountId) -> Result<Wei> {
        let mut state = self.state.write().await;

        let balance = state.escrow.balance_of(caller);
        if balance < state.min_withdraw_wei {
            return Err(FractionalError::BelowMinimumWithdrawal {
                balance,
                minimum: state.min_withdraw_wei,
            });
        }

        // Effects before external transfer: zero first, then pay
        let amount = state.escrow.take(caller);
        if let Err(err) = self.payments.pay_out(caller, amount).await {
            state.escrow.restore(caller, amount)?;
            return Err(err);
        }
        info!(caller = %caller, amount = %amount, "sales profit withdrawn");
        Ok(amount)
    }

    // ========================================================================
    // Administrative surface
    // ========================================================================

    /// Change the minimum withdrawal threshold. Admin only.
    pub async fn set_min_withdraw_wei(&self, caller: &AccountId, amount: Wei) -> Result<()> {
        if caller != &self.admin {
            return Err(FractionalError::NotAuthorized {
                account: caller.clone(),
            });
        }
        let mut state = self.state.write().await;
        state.min_withdraw_wei = amount;
        info!(minimum = %amount, "minimum withdrawal updated");
        Ok(())
    }

    // ========================================================================
    // Read API
    // ========================================================================

    /// All custody records deposited by `caller`
    pub async fn user_nfts(&self, caller: &AccountId) -> Vec<(TokenUid, CustodyRecord)> {
        self.state.read().await.custody.records_of(caller)
    }

    /// All of `caller`'s live holding entries
    pub async fn user_bought_fractions(&self, caller: &AccountId) -> Vec<HoldingEntry> {
        self.state.read().await.holdings.list_for(caller)
    }

    /// Every listed asset, most-recently-listed first
    pub async fn all_nfts_for_sale(&self) -> Vec<(TokenUid, CustodyRecord)> {
        let state = self.state.read().await;
        state
            .listings
            .iter()
            .filter_map(|uid| state.custody.get(&uid).ok().map(|r| (uid, r.clone())))
            .collect()
    }

    /// `caller`'s accumulated, not-yet-withdrawn proceeds
    pub async fn user_profit(&self, caller: &AccountId) -> Wei {
        self.state.read().await.escrow.balance_of(caller)
    }

    /// The current minimum withdrawal threshold
    pub async fn min_withdraw_wei(&self) -> Wei {
        self.state.read().await.min_withdraw_wei
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryNft, InMemoryPaymentRail, InMemoryShareVault};

    struct Harness {
        market: Marketplace,
        nft: Arc<InMemoryNft>,
        vault: Arc<InMemoryShareVault>,
        rail: Arc<InMemoryPaymentRail>,
        admin: AccountId,
        contract: ContractRef,
    }

    fn harness() -> Harness {
        let nft = Arc::new(InMemoryNft::new());
        let vault = Arc::new(InMemoryShareVault::new());
        let rail = Arc::new(InMemoryPaymentRail::new());
        let admin = AccountId::new();
        let market = Marketplace::new(
            MarketplaceConfig::new(admin.clone()),
            nft.clone(),
            vault.clone(),
            rail.clone(),
        );
        Harness {
            market,
            nft,
            vault,
            rail,
            admin,
            contract: ContractRef::new(),
        }
    }

    /// Mint an asset to `owner` and grant the engine blanket approval
    async fn mint_approved(h: &Harness, owner: &AccountId, no: u128) -> TokenNo {
        let token_no = TokenNo(no);
        h.nft.mint(&h.contract, owner, token_no).await;
        h.nft
            .set_approval_for_all(owner, h.market.engine_account(), true)
            .await;
        token_no
    }

    async fn deposit_fractionalized(
        h: &Harness,
        owner: &AccountId,
        no: u128,
        supply: u64,
    ) -> TokenUid {
        let token_no = mint_approved(h, owner, no).await;
        let uid = h.market.deposit(owner, &h.contract, token_no).await.unwrap();
        h.market
            .fractionalize(owner, uid, supply, "Fractions", "FRC")
            .await
            .unwrap();
        uid
    }

    #[tokio::test]
    async fn test_deposit_takes_custody() {
        let h = harness();
        let owner = AccountId::new();
        let token_no = mint_approved(&h, &owner, 1111).await;

        let uid = h.market.deposit(&owner, &h.contract, token_no).await.unwrap();
        assert_eq!(uid, h.market.unique_token_id(&h.contract, token_no));

        // The engine account now holds the asset
        assert_eq!(
            h.nft.owner_of(&h.contract, token_no).await.unwrap(),
            *h.market.engine_account()
        );
        assert_eq!(h.market.user_nfts(&owner).await.len(), 1);
    }

    #[tokio::test]
    async fn test_deposit_requires_ownership_and_approval() {
        let h = harness();
        let owner = AccountId::new();
        let stranger = AccountId::new();
        let token_no = TokenNo(1);
        h.nft.mint(&h.contract, &owner, token_no).await;

        let err = h.market.deposit(&stranger, &h.contract, token_no).await;
        assert!(matches!(err, Err(FractionalError::NotOwner { .. })));

        // Owner without blanket approval is rejected too
        let err = h.market.deposit(&owner, &h.contract, token_no).await;
        assert!(matches!(err, Err(FractionalError::NotApproved { .. })));
    }

    #[tokio::test]
    async fn test_double_deposit_rejected() {
        let h = harness();
        let owner = AccountId::new();
        let token_no = mint_approved(&h, &owner, 1).await;

        h.market.deposit(&owner, &h.contract, token_no).await.unwrap();
        let err = h.market.deposit(&owner, &h.contract, token_no).await;
        assert!(matches!(err, Err(FractionalError::AlreadyDeposited { .. })));
    }

    #[tokio::test]
    async fn test_fractionalize_once_only() {
        let h = harness();
        let owner = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;

        let err = h.market.fractionalize(&owner, uid, 50, "Again", "AGN").await;
        assert!(matches!(
            err,
            Err(FractionalError::AlreadyFractionalized { .. })
        ));
    }

    #[tokio::test]
    async fn test_fractionalize_owner_only_and_nonzero_supply() {
        let h = harness();
        let owner = AccountId::new();
        let stranger = AccountId::new();
        let token_no = mint_approved(&h, &owner, 1).await;
        let uid = h.market.deposit(&owner, &h.contract, token_no).await.unwrap();

        let err = h.market.fractionalize(&stranger, uid, 100, "F", "F").await;
        assert!(matches!(err, Err(FractionalError::NotOwner { .. })));

        let err = h.market.fractionalize(&owner, uid, 0, "F", "F").await;
        assert!(matches!(err, Err(FractionalError::InvalidSupply { .. })));
    }

    #[tokio::test]
    async fn test_sell_lists_the_asset() {
        let h = harness();
        let owner = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;

        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();
        let listed = h.market.all_nfts_for_sale().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, uid);
        assert!(listed[0].1.for_sale);
    }

    #[tokio::test]
    async fn test_sell_requires_fractionalized_and_not_listed() {
        let h = harness();
        let owner = AccountId::new();
        let token_no = mint_approved(&h, &owner, 1).await;
        let uid = h.market.deposit(&owner, &h.contract, token_no).await.unwrap();

        let err = h.market.sell(&owner, uid, Wei::new(10)).await;
        assert!(matches!(err, Err(FractionalError::NotFractionalized { .. })));

        h.market
            .fractionalize(&owner, uid, 10, "F", "F")
            .await
            .unwrap();
        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();
        let err = h.market.sell(&owner, uid, Wei::new(20)).await;
        assert!(matches!(err, Err(FractionalError::AlreadyForSale { .. })));
    }

    #[tokio::test]
    async fn test_deposit_fractionalize_sell_composite() {
        let h = harness();
        let owner = AccountId::new();
        let token_no = mint_approved(&h, &owner, 7).await;

        let uid = h
            .market
            .deposit_fractionalize_sell(&owner, &h.contract, token_no, 100, "F", "F", Wei::new(5))
            .await
            .unwrap();

        assert_eq!(h.market.all_nfts_for_sale().await.len(), 1);
        let (_, record) = &h.market.user_nfts(&owner).await[0];
        assert_eq!(record.fractions_total_supply, 100);
        assert_eq!(h.market.unique_token_id(&h.contract, token_no), uid);
    }

    #[tokio::test]
    async fn test_composite_failure_commits_nothing() {
        let h = harness();
        let owner = AccountId::new();
        let token_no = mint_approved(&h, &owner, 7).await;

        // A zero supply dooms the fractionalize step; the deposit must not
        // have taken effect either
        let err = h
            .market
            .deposit_fractionalize_sell(&owner, &h.contract, token_no, 0, "F", "F", Wei::new(5))
            .await;
        assert!(matches!(err, Err(FractionalError::InvalidSupply { .. })));
        assert!(h.market.all_nfts_for_sale().await.is_empty());
        assert!(h.market.user_nfts(&owner).await.is_empty());
        assert_eq!(h.nft.owner_of(&h.contract, token_no).await.unwrap(), owner);
    }

    #[tokio::test]
    async fn test_buy_partial_updates_ledgers() {
        let h = harness();
        let owner = AccountId::new();
        let buyer = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;
        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();

        h.market.buy(&buyer, uid, 40, Wei::new(400)).await.unwrap();

        let holdings = h.market.user_bought_fractions(&buyer).await;
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].shares_owned, 40);
        assert_eq!(h.market.user_profit(&owner).await, Wei::new(400));
        assert_eq!(h.vault.balance_of(uid, &buyer).await.unwrap(), 40);

        // Still listed with the remaining supply
        let listed = h.market.all_nfts_for_sale().await;
        assert_eq!(listed[0].1.available_fractions, 60);
    }

    #[tokio::test]
    async fn test_buy_own_fractions_rejected() {
        let h = harness();
        let owner = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;
        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();

        let err = h.market.buy(&owner, uid, 10, Wei::new(100)).await;
        assert!(matches!(
            err,
            Err(FractionalError::CannotBuyOwnFractions { .. })
        ));
    }

    #[tokio::test]
    async fn test_buy_insufficient_payment_rejected() {
        let h = harness();
        let owner = AccountId::new();
        let buyer = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;
        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();

        let err = h.market.buy(&buyer, uid, 40, Wei::new(399)).await;
        assert!(matches!(
            err,
            Err(FractionalError::InsufficientPayment {
                required: Wei(400),
                ..
            })
        ));
        // Nothing committed
        assert!(h.market.user_bought_fractions(&buyer).await.is_empty());
        assert_eq!(h.market.user_profit(&owner).await, Wei::zero());
    }

    #[tokio::test]
    async fn test_buy_overpayment_credited_in_full() {
        let h = harness();
        let owner = AccountId::new();
        let buyer = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;
        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();

        h.market.buy(&buyer, uid, 10, Wei::new(150)).await.unwrap();
        assert_eq!(h.market.user_profit(&owner).await, Wei::new(150));
    }

    #[tokio::test]
    async fn test_zero_amount_buy_rejected() {
        let h = harness();
        let owner = AccountId::new();
        let buyer = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;
        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();

        // Zero shares for zero payment must not create a holdings entry
        let err = h.market.buy(&buyer, uid, 0, Wei::zero()).await;
        assert!(matches!(
            err,
            Err(FractionalError::InvalidSupply { supply: 0, .. })
        ));
        assert!(h.market.user_bought_fractions(&buyer).await.is_empty());
        assert_eq!(h.market.user_profit(&owner).await, Wei::zero());
    }

    #[tokio::test]
    async fn test_buy_more_than_available_rejected() {
        let h = harness();
        let owner = AccountId::new();
        let buyer = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;
        h.market.sell(&owner, uid, Wei::new(1)).await.unwrap();

        let err = h.market.buy(&buyer, uid, 101, Wei::new(101)).await;
        assert!(matches!(
            err,
            Err(FractionalError::InsufficientFractions { available: 100, .. })
        ));
    }

    #[tokio::test]
    async fn test_buying_full_supply_delists() {
        let h = harness();
        let owner = AccountId::new();
        let buyer = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;
        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();

        h.market.buy(&buyer, uid, 100, Wei::new(1000)).await.unwrap();

        assert!(h.market.all_nfts_for_sale().await.is_empty());
        let (_, record) = &h.market.user_nfts(&owner).await[0];
        assert!(record.sold_out);
        assert!(!record.for_sale);
        assert_eq!(record.available_fractions, 0);

        // Sold out assets cannot be bought or re-listed
        let err = h.market.buy(&buyer, uid, 1, Wei::new(10)).await;
        assert!(matches!(err, Err(FractionalError::NotForSale { .. })));
        let err = h.market.sell(&owner, uid, Wei::new(20)).await;
        assert!(matches!(err, Err(FractionalError::AlreadySoldOut { .. })));
    }

    #[tokio::test]
    async fn test_repeat_buys_merge_holdings() {
        let h = harness();
        let owner = AccountId::new();
        let buyer = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;
        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();

        h.market.buy(&buyer, uid, 30, Wei::new(300)).await.unwrap();
        h.market.buy(&buyer, uid, 20, Wei::new(200)).await.unwrap();

        let holdings = h.market.user_bought_fractions(&buyer).await;
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].shares_owned, 50);

        // Conservation: sold shares equal total minus available
        let (_, record) = &h.market.user_nfts(&owner).await[0];
        assert_eq!(
            record.fractions_total_supply - record.available_fractions,
            50
        );
    }

    #[tokio::test]
    async fn test_buy_back_requires_full_ownership() {
        let h = harness();
        let owner = AccountId::new();
        let buyer = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;
        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();
        h.market.buy(&buyer, uid, 60, Wei::new(600)).await.unwrap();

        let err = h.market.buy_back_nft(&buyer, uid).await;
        assert!(matches!(
            err,
            Err(FractionalError::IncompleteOwnership {
                held: 60,
                total: 100,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_buy_back_returns_custody() {
        let h = harness();
        let owner = AccountId::new();
        let buyer = AccountId::new();
        let token_no = mint_approved(&h, &owner, 1111).await;
        let uid = h.market.deposit(&owner, &h.contract, token_no).await.unwrap();
        h.market
            .fractionalize(&owner, uid, 100, "F", "F")
            .await
            .unwrap();
        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();
        h.market.buy(&buyer, uid, 100, Wei::new(1000)).await.unwrap();

        // Burn is allowance-based: pre-authorize the engine
        h.vault.approve(uid, &buyer, h.market.engine_account()).await;
        h.market.buy_back_nft(&buyer, uid).await.unwrap();

        assert_eq!(h.nft.owner_of(&h.contract, token_no).await.unwrap(), buyer);
        assert_eq!(h.vault.balance_of(uid, &buyer).await.unwrap(), 0);
        assert!(h.market.user_bought_fractions(&buyer).await.is_empty());
        assert!(h.market.user_nfts(&owner).await.is_empty());
        assert!(h.market.all_nfts_for_sale().await.is_empty());

        // The record is gone entirely
        let err = h.market.buy_back_nft(&buyer, uid).await;
        assert!(matches!(err, Err(FractionalError::TokenNotFound { .. })));
    }

    #[tokio::test]
    async fn test_buy_back_without_allowance_commits_nothing() {
        let h = harness();
        let owner = AccountId::new();
        let buyer = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 10).await;
        h.market.sell(&owner, uid, Wei::new(1)).await.unwrap();
        h.market.buy(&buyer, uid, 10, Wei::new(10)).await.unwrap();

        let err = h.market.buy_back_nft(&buyer, uid).await;
        assert!(matches!(
            err,
            Err(FractionalError::InsufficientAllowance { .. })
        ));
        // Custody record and holdings survive the failed buy-back
        assert_eq!(h.market.user_nfts(&owner).await.len(), 1);
        assert_eq!(h.market.user_bought_fractions(&buyer).await.len(), 1);
    }

    #[tokio::test]
    async fn test_withdraw_below_minimum_rejected() {
        let h = harness();
        let owner = AccountId::new();
        let buyer = AccountId::new();
        h.market
            .set_min_withdraw_wei(&h.admin, Wei::new(500))
            .await
            .unwrap();

        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;
        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();
        h.market.buy(&buyer, uid, 40, Wei::new(400)).await.unwrap();

        let err = h.market.withdraw_sales_profit(&owner).await;
        assert!(matches!(
            err,
            Err(FractionalError::BelowMinimumWithdrawal {
                balance: Wei(400),
                minimum: Wei(500),
            })
        ));
    }

    #[tokio::test]
    async fn test_withdraw_pays_out_exactly_prior_balance() {
        let h = harness();
        let owner = AccountId::new();
        let buyer = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;
        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();
        h.market.buy(&buyer, uid, 40, Wei::new(400)).await.unwrap();

        let paid = h.market.withdraw_sales_profit(&owner).await.unwrap();
        assert_eq!(paid, Wei::new(400));
        assert_eq!(h.market.user_profit(&owner).await, Wei::zero());
        assert_eq!(h.rail.payouts().await, vec![(owner.clone(), Wei::new(400))]);
    }

    #[tokio::test]
    async fn test_failed_payout_restores_escrow() {
        let h = harness();
        let owner = AccountId::new();
        let buyer = AccountId::new();
        let uid = deposit_fractionalized(&h, &owner, 1, 100).await;
        h.market.sell(&owner, uid, Wei::new(10)).await.unwrap();
        h.market.buy(&buyer, uid, 40, Wei::new(400)).await.unwrap();

        h.rail.set_failing(true);
        let err = h.market.withdraw_sales_profit(&owner).await;
        assert!(matches!(err, Err(FractionalError::PaymentFailed { .. })));
        assert_eq!(h.market.user_profit(&owner).await, Wei::new(400));
    }

    #[tokio::test]
    async fn test_set_min_withdraw_admin_only() {
        let h = harness();
        let stranger = AccountId::new();

        let err = h.market.set_min_withdraw_wei(&stranger, Wei::new(1)).await;
        assert!(matches!(err, Err(FractionalError::NotAuthorized { .. })));

        h.market
            .set_min_withdraw_wei(&h.admin, Wei::new(1000))
            .await
            .unwrap();
        assert_eq!(h.market.min_withdraw_wei().await, Wei::new(1000));
    }

    #[tokio::test]
    async fn test_listing_enumeration_order() {
        let h = harness();
        let owner = AccountId::new();
        let mut uids = Vec::new();
        for no in 1..=3 {
            let uid = deposit_fractionalized(&h, &owner, no, 10).await;
            h.market.sell(&owner, uid, Wei::new(1)).await.unwrap();
            uids.push(uid);
        }

        let listed: Vec<_> = h
            .market
            .all_nfts_for_sale()
            .await
            .into_iter()
            .map(|(uid, _)| uid)
            .collect();
        // Most recently listed first
        assert_eq!(listed, vec![uids[2], uids[1], uids[0]]);
    }
}
