//! In-memory collaborator implementations
//!
//! Reference implementations of the external collaborators, used by the test
//! suites and by anyone embedding the engine without real token contracts.

use crate::collab::{NftContract, PaymentRail, ShareVault};
use fractional_types::{
    AccountId, ContractRef, FractionalError, Result, TokenNo, TokenUid, Wei,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// In-memory non-fungible asset contract
#[derive(Default)]
pub struct InMemoryNft {
    /// (contract, token) -> current owner
    tokens: RwLock<HashMap<(ContractRef, TokenNo), AccountId>>,
    /// (owner, operator) pairs with blanket approval
    approvals: RwLock<HashSet<(AccountId, AccountId)>>,
}

impl InMemoryNft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint an asset to an owner
    pub async fn mint(&self, contract: &ContractRef, to: &AccountId, token_no: TokenNo) {
        self.tokens
            .write()
            .await
            .insert((contract.clone(), token_no), to.clone());
    }

    /// Grant or revoke blanket operator approval
    pub async fn set_approval_for_all(
        &self,
        owner: &AccountId,
        operator: &AccountId,
        approved: bool,
    ) {
        let mut approvals = self.approvals.write().await;
        let pair = (owner.clone(), operator.clone());
        if approved {
            approvals.insert(pair);
        } else {
            approvals.remove(&pair);
        }
    }
}

#[async_trait::async_trait]
impl NftContract for InMemoryNft {
    async fn owner_of(&self, contract: &ContractRef, token_no: TokenNo) -> Result<AccountId> {
        self.tokens
            .read()
            .await
            .get(&(contract.clone(), token_no))
            .cloned()
            .ok_or(FractionalError::TokenNotFound {
                token_uid: TokenUid::resolve(contract, token_no),
            })
    }

    async fn is_approved_for_all(&self, owner: &AccountId, operator: &AccountId) -> Result<bool> {
        Ok(self
            .approvals
            .read()
            .await
            .contains(&(owner.clone(), operator.clone())))
    }

    async fn transfer(
        &self,
        contract: &ContractRef,
        from: &AccountId,
        to: &AccountId,
        token_no: TokenNo,
    ) -> Result<()> {
        let mut tokens = self.tokens.write().await;
        let key = (contract.clone(), token_no);
        match tokens.get(&key) {
            Some(owner) if owner == from => {
                tokens.insert(key, to.clone());
                Ok(())
            }
            Some(_) => Err(FractionalError::NotOwner {
                account: from.clone(),
                token_uid: TokenUid::resolve(contract, token_no),
            }),
            None => Err(FractionalError::TokenNotFound {
                token_uid: TokenUid::resolve(contract, token_no),
            }),
        }
    }
}

/// One fractionalized asset's share supply
struct ShareSupply {
    contract: ContractRef,
    name: String,
    symbol: String,
    balances: HashMap<AccountId, u64>,
    /// (holder, operator) pairs with blanket allowance
    operators: HashSet<(AccountId, AccountId)>,
}

/// In-memory fungible share collaborator
#[derive(Default)]
pub struct InMemoryShareVault {
    supplies: RwLock<HashMap<TokenUid, ShareSupply>>,
}

impl InMemoryShareVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `operator` a blanket allowance over `holder`'s shares. Buyers
    /// call this before buy-back, matching the allowance-based burn.
    pub async fn approve(&self, uid: TokenUid, holder: &AccountId, operator: &AccountId) {
        if let Some(supply) = self.supplies.write().await.get_mut(&uid) {
            supply
                .operators
                .insert((holder.clone(), operator.clone()));
        }
    }

    /// The share contract reference for a fractionalized asset, if created
    pub async fn contract_of(&self, uid: TokenUid) -> Option<ContractRef> {
        self.supplies
            .read()
            .await
            .get(&uid)
            .map(|s| s.contract.clone())
    }

    /// The (name, symbol) pair the shares were created with, if created
    pub async fn metadata_of(&self, uid: TokenUid) -> Option<(String, String)> {
        self.supplies
            .read()
            .await
            .get(&uid)
            .map(|s| (s.name.clone(), s.symbol.clone()))
    }
}

#[async_trait::async_trait]
impl ShareVault for InMemoryShareVault {
    async fn create_shares(
        &self,
        uid: TokenUid,
        name: &str,
        symbol: &str,
        owner: &AccountId,
        operator: &AccountId,
        supply: u64,
    ) -> Result<ContractRef> {
        let contract = ContractRef::new();
        let mut balances = HashMap::new();
        balances.insert(owner.clone(), supply);
        let mut operators = HashSet::new();
        operators.insert((owner.clone(), operator.clone()));

        self.supplies.write().await.insert(
            uid,
            ShareSupply {
                contract: contract.clone(),
                name: name.to_string(),
                symbol: symbol.to_string(),
                balances,
                operators,
            },
        );
        Ok(contract)
    }

    async fn transfer_from(
        &self,
        uid: TokenUid,
        operator: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<()> {
        let mut supplies = self.supplies.write().await;
        let supply = supplies
            .get_mut(&uid)
            .ok_or(FractionalError::TokenNotFound { token_uid: uid })?;

        if from != operator && !supply.operators.contains(&(from.clone(), operator.clone())) {
            return Err(FractionalError::InsufficientAllowance {
                account: from.clone(),
                token_uid: uid,
            });
        }

        let available = supply.balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(FractionalError::InsufficientShares {
                account: from.clone(),
                token_uid: uid,
                requested: amount,
                available,
            });
        }

        supply.balances.insert(from.clone(), available - amount);
        *supply.balances.entry(to.clone()).or_insert(0) += amount;
        Ok(())
    }

    async fn burn_from(
        &self,
        uid: TokenUid,
        operator: &AccountId,
        holder: &AccountId,
        amount: u64,
    ) -> Result<()> {
        let mut supplies = self.supplies.write().await;
        let supply = supplies
            .get_mut(&uid)
            .ok_or(FractionalError::TokenNotFound { token_uid: uid })?;

        if holder != operator
            && !supply
                .operators
                .contains(&(holder.clone(), operator.clone()))
        {
            return Err(FractionalError::InsufficientAllowance {
                account: holder.clone(),
                token_uid: uid,
            });
        }

        let available = supply.balances.get(holder).copied().unwrap_or(0);
        if available < amount {
            return Err(FractionalError::InsufficientShares {
                account: holder.clone(),
                token_uid: uid,
                requested: amount,
                available,
            });
        }

        supply.balances.insert(holder.clone(), available - amount);
        Ok(())
    }

    async fn balance_of(&self, uid: TokenUid, account: &AccountId) -> Result<u64> {
        let supplies = self.supplies.read().await;
        let supply = supplies
            .get(&uid)
            .ok_or(FractionalError::TokenNotFound { token_uid: uid })?;
        Ok(supply.balances.get(account).copied().unwrap_or(0))
    }
}

/// In-memory payout rail, recording every payout it executes
#[derive(Default)]
pub struct InMemoryPaymentRail {
    payouts: RwLock<Vec<(AccountId, Wei)>>,
    failing: AtomicBool,
}

impl InMemoryPaymentRail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent payouts fail, for exercising compensation paths
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All payouts executed so far
    pub async fn payouts(&self) -> Vec<(AccountId, Wei)> {
        self.payouts.read().await.clone()
    }
}

#[async_trait::async_trait]
impl PaymentRail for InMemoryPaymentRail {
    async fn pay_out(&self, to: &AccountId, amount: Wei) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FractionalError::PaymentFailed {
                account: to.clone(),
                amount,
                reason: "rail unavailable".to_string(),
            });
        }
        self.payouts.write().await.push((to.clone(), amount));
        Ok(())
    }
}
