// crates/tally-economics/src/runtime.rs
//
// The runtime aggregate: token bank, roles, and the four contract instances.
//
// Every mutating entry point runs through `atomically`, so a contract
// operation either commits its own state and all of its token calls, or
// leaves both untouched. The runtime itself is not synchronized; callers
// share it behind a single lock (see `tally_rpc::SharedRuntime`).

use serde::{Deserialize, Serialize};

use tally_core::{ensure_not_vault, ensure_owner, AccessControl, AccountId, Asset, RoleRegistry, TallyError, TokenLedger};

use crate::journal::{atomically, Transaction};
use crate::liquidity::{LiquidityConfig, LiquidityIncentive};
use crate::referral::{ReferralConfig, ReferralProgram};
use crate::rewards::{RewardManager, RewardManagerConfig};
use crate::stablecoin::{Stablecoin, StablecoinConfig};
use crate::token::TokenBank;

/// Roles and per-contract parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Account allowed to change parameters and mint non-stable assets.
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Accounts allowed to report task points and activity.
    #[serde(default)]
    pub oracles: Vec<String>,

    #[serde(default)]
    pub liquidity: LiquidityConfig,

    #[serde(default)]
    pub stablecoin: StablecoinConfig,

    #[serde(default)]
    pub referral: ReferralConfig,

    #[serde(default)]
    pub rewards: RewardManagerConfig,
}

fn default_owner() -> String {
    "owner".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            oracles: Vec::new(),
            liquidity: LiquidityConfig::default(),
            stablecoin: StablecoinConfig::default(),
            referral: ReferralConfig::default(),
            rewards: RewardManagerConfig::default(),
        }
    }
}

/// Supply of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSupply {
    pub asset: Asset,
    pub minter: AccountId,
    pub total_supply: u64,
}

/// Headline numbers of every contract, for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSummary {
    pub owner: AccountId,
    pub oracles: Vec<AccountId>,
    pub assets: Vec<AssetSupply>,
    pub liquidity_total_weight: u128,
    pub liquidity_forfeited: u128,
    pub stablecoin_total_debt: u64,
    pub stablecoin_cumulative_fees: u64,
    pub referral_total_points: u128,
    pub referral_redemption_reserve: u64,
    pub rewards_staking_weight: u128,
    pub rewards_activity_weight: u128,
}

#[derive(Debug, Clone)]
pub struct Runtime {
    tokens: TokenBank,
    roles: RoleRegistry,
    liquidity: LiquidityIncentive,
    stablecoin: Stablecoin,
    referral: ReferralProgram,
    rewards: RewardManager,
}

impl Runtime {
    /// Build the runtime and register every asset the contracts use.
    ///
    /// The owner mints all assets except the stable asset, which only the
    /// stablecoin vault may mint or burn.
    pub fn new(config: &RuntimeConfig, genesis: u64) -> Result<Self, TallyError> {
        let owner = AccountId::new(config.owner.clone());
        let roles = RoleRegistry::with_oracles(
            owner.clone(),
            config.oracles.iter().map(|o| AccountId::new(o.clone())),
        );

        let liquidity = LiquidityIncentive::new(&config.liquidity, genesis)?;
        let stablecoin = Stablecoin::new(&config.stablecoin)?;
        let referral = ReferralProgram::new(&config.referral)?;
        let rewards = RewardManager::new(&config.rewards, genesis)?;

        let mut tokens = TokenBank::new();
        tokens.register_asset(stablecoin.stable_asset().clone(), stablecoin.vault().clone())?;
        let owner_assets = [
            liquidity.lp_asset(),
            liquidity.reward_asset(),
            stablecoin.collateral_asset(),
            referral.reward_asset(),
            rewards.stake_asset(),
            rewards.reward_asset(),
        ];
        for asset in owner_assets {
            if asset == stablecoin.stable_asset() {
                return Err(TallyError::InvalidParameter(format!(
                    "{} is the stable asset and cannot back another contract",
                    asset
                )));
            }
            if tokens.minter(asset).is_none() {
                tokens.register_asset(asset.clone(), owner.clone())?;
            }
        }

        tracing::info!(
            owner = %owner,
            assets = tokens.assets().count(),
            genesis,
            "Runtime initialized"
        );

        Ok(Self {
            tokens,
            roles,
            liquidity,
            stablecoin,
            referral,
            rewards,
        })
    }

    pub fn tokens(&self) -> &TokenBank {
        &self.tokens
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    pub fn roles_mut(&mut self) -> &mut RoleRegistry {
        &mut self.roles
    }

    pub fn liquidity(&self) -> &LiquidityIncentive {
        &self.liquidity
    }

    pub fn stablecoin(&self) -> &Stablecoin {
        &self.stablecoin
    }

    pub fn referral(&self) -> &ReferralProgram {
        &self.referral
    }

    pub fn rewards(&self) -> &RewardManager {
        &self.rewards
    }

    /// Run a liquidity operation atomically.
    pub fn with_liquidity<R, F>(&mut self, op: F) -> Result<R, TallyError>
    where
        F: FnOnce(&mut LiquidityIncentive, &mut Transaction<'_>, &dyn AccessControl) -> Result<R, TallyError>,
    {
        let Runtime {
            tokens,
            roles,
            liquidity,
            ..
        } = self;
        atomically(liquidity, tokens, |contract, tx| op(contract, tx, &*roles))
    }

    pub fn with_stablecoin<R, F>(&mut self, op: F) -> Result<R, TallyError>
    where
        F: FnOnce(&mut Stablecoin, &mut Transaction<'_>, &dyn AccessControl) -> Result<R, TallyError>,
    {
        let Runtime {
            tokens,
            roles,
            stablecoin,
            ..
        } = self;
        atomically(stablecoin, tokens, |contract, tx| op(contract, tx, &*roles))
    }

    pub fn with_referral<R, F>(&mut self, op: F) -> Result<R, TallyError>
    where
        F: FnOnce(&mut ReferralProgram, &mut Transaction<'_>, &dyn AccessControl) -> Result<R, TallyError>,
    {
        let Runtime {
            tokens,
            roles,
            referral,
            ..
        } = self;
        atomically(referral, tokens, |contract, tx| op(contract, tx, &*roles))
    }

    pub fn with_rewards<R, F>(&mut self, op: F) -> Result<R, TallyError>
    where
        F: FnOnce(&mut RewardManager, &mut Transaction<'_>, &dyn AccessControl) -> Result<R, TallyError>,
    {
        let Runtime {
            tokens,
            roles,
            rewards,
            ..
        } = self;
        atomically(rewards, tokens, |contract, tx| op(contract, tx, &*roles))
    }

    /// Run plain token calls atomically.
    pub fn with_tokens<R, F>(&mut self, op: F) -> Result<R, TallyError>
    where
        F: FnOnce(&mut Transaction<'_>, &dyn AccessControl) -> Result<R, TallyError>,
    {
        let Runtime { tokens, roles, .. } = self;
        atomically(&mut (), tokens, |_, tx| op(tx, &*roles))
    }

    /// Move `amount` of `asset` from `caller` to `to`.
    ///
    /// # Errors
    /// `Unauthorized` when `caller` is a contract vault.
    pub fn transfer(
        &mut self,
        caller: &AccountId,
        asset: &Asset,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError> {
        ensure_not_vault(caller)?;
        if amount == 0 {
            return Err(TallyError::ZeroAmount);
        }
        self.with_tokens(|tx, _| tx.transfer(asset, caller, to, amount))
    }

    /// Set the allowance `spender` may pull from `owner`; returns it.
    ///
    /// # Errors
    /// `Unauthorized` when `owner` is a contract vault.
    pub fn approve(
        &mut self,
        owner: &AccountId,
        asset: &Asset,
        spender: &AccountId,
        amount: u64,
    ) -> Result<u64, TallyError> {
        ensure_not_vault(owner)?;
        self.with_tokens(|tx, _| {
            tx.approve(asset, owner, spender, amount);
            Ok(tx.allowance(asset, owner, spender))
        })
    }

    /// Mint `amount` of an owner-minted asset. Owner only.
    pub fn owner_mint(
        &mut self,
        caller: &AccountId,
        asset: &Asset,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError> {
        self.with_tokens(|tx, access| {
            ensure_owner(access, caller)?;
            if amount == 0 {
                return Err(TallyError::ZeroAmount);
            }
            tx.mint(asset, caller, to, amount)
        })
    }

    /// Credit a starting balance, minted by the asset's owner-side minter.
    pub fn mint_genesis(&mut self, asset: &Asset, to: &AccountId, amount: u64) -> Result<(), TallyError> {
        let owner = self.roles.owner().clone();
        self.owner_mint(&owner, asset, to, amount)
    }

    pub fn summary(&self) -> RuntimeSummary {
        let assets = self
            .tokens
            .assets()
            .filter_map(|asset| {
                self.tokens.minter(asset).map(|minter| AssetSupply {
                    asset: asset.clone(),
                    minter: minter.clone(),
                    total_supply: self.tokens.total_supply(asset),
                })
            })
            .collect();
        RuntimeSummary {
            owner: self.roles.owner().clone(),
            oracles: self.roles.oracles().cloned().collect(),
            assets,
            liquidity_total_weight: self.liquidity.ledger_state().total_weighted_stake,
            liquidity_forfeited: self.liquidity.total_forfeited(),
            stablecoin_total_debt: self.stablecoin.total_debt(),
            stablecoin_cumulative_fees: self.stablecoin.cumulative_fees(),
            referral_total_points: self.referral.ledger_state().total_weighted_stake,
            referral_redemption_reserve: self.referral.redemption_reserve(),
            rewards_staking_weight: self.rewards.staking_state().total_weighted_stake,
            rewards_activity_weight: self.rewards.activity_state().total_weighted_stake,
        }
    }

    pub fn balance_of(&self, asset: &Asset, owner: &AccountId) -> u64 {
        self.tokens.balance_of(asset, owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weighting::SECONDS_PER_DAY;

    fn runtime() -> Runtime {
        let config = RuntimeConfig {
            oracles: vec!["oracle".to_string()],
            ..RuntimeConfig::default()
        };
        Runtime::new(&config, 0).unwrap()
    }

    #[test]
    fn test_assets_registered_once() {
        let rt = runtime();
        let summary = rt.summary();
        let symbols: Vec<&str> = summary.assets.iter().map(|a| a.asset.symbol()).collect();
        assert_eq!(symbols, vec!["COLL", "LP", "REWARD", "STABLE"]);
        let stable = summary
            .assets
            .iter()
            .find(|a| a.asset.symbol() == "STABLE")
            .unwrap();
        assert_eq!(stable.minter, AccountId::vault("stablecoin"));
    }

    #[test]
    fn test_owner_cannot_mint_stable() {
        let mut rt = runtime();
        let owner = AccountId::new("owner");
        let result = rt.owner_mint(&owner, &Asset::new("STABLE"), &owner, 5);
        assert!(matches!(result, Err(TallyError::Transfer(_))));
        let result = rt.owner_mint(&AccountId::new("mallory"), &Asset::new("LP"), &owner, 5);
        assert!(matches!(result, Err(TallyError::Unauthorized(_))));
    }

    #[test]
    fn test_liquidity_through_runtime() {
        let mut rt = runtime();
        let alice = AccountId::new("alice");
        let lp = Asset::new("LP");
        let vault = rt.liquidity().vault().clone();
        rt.mint_genesis(&lp, &alice, 1_000).unwrap();
        rt.mint_genesis(&Asset::new("REWARD"), &vault, 10_000).unwrap();
        rt.with_tokens(|tx, _| {
            tx.approve(&lp, &alice, &vault, 1_000);
            Ok(())
        })
        .unwrap();

        let view = rt
            .with_liquidity(|c, tx, _| c.deposit(tx, &alice, 1_000, 365 * SECONDS_PER_DAY, 0))
            .unwrap();
        assert_eq!(view.weight, 2_000);
        assert_eq!(rt.liquidity().preview_pending(&alice, 10).unwrap(), 100);
        assert_eq!(rt.balance_of(&lp, &alice), 0);
    }

    #[test]
    fn test_failed_operation_leaves_runtime_untouched() {
        let mut rt = runtime();
        let alice = AccountId::new("alice");
        rt.mint_genesis(&Asset::new("COLL"), &alice, 1_000).unwrap();
        // No allowance for the stablecoin vault.
        let result = rt.with_stablecoin(|c, tx, _| c.deposit_collateral(tx, &alice, 500));
        assert!(matches!(result, Err(TallyError::Transfer(_))));
        assert_eq!(rt.balance_of(&Asset::new("COLL"), &alice), 1_000);
        assert_eq!(rt.stablecoin().position(&alice).unwrap().collateral, 0);
    }

    #[test]
    fn test_admin_ops_see_roles() {
        let mut rt = runtime();
        let owner = AccountId::new("owner");
        rt.with_stablecoin(|c, _, access| c.set_collateral_ratio(access, &owner, 20_000))
            .unwrap();
        assert_eq!(rt.stablecoin().policy().collateral_ratio_bp, 20_000);
        let oracle = AccountId::new("oracle");
        let bob = AccountId::new("bob");
        rt.with_rewards(|c, _, access| c.record_activity(access, &oracle, &bob, 5, 0))
            .unwrap();
        assert_eq!(rt.rewards().account(&bob).activity_points, 5);
    }

    #[test]
    fn test_vault_balances_move_only_through_contracts() {
        let mut rt = runtime();
        let alice = AccountId::new("alice");
        let lp = Asset::new("LP");
        let vault = rt.liquidity().vault().clone();
        rt.mint_genesis(&lp, &alice, 1_000).unwrap();
        rt.approve(&alice, &lp, &vault, 1_000).unwrap();
        rt.with_liquidity(|c, tx, _| c.deposit(tx, &alice, 1_000, 90 * SECONDS_PER_DAY, 0))
            .unwrap();

        let mallory = AccountId::new("mallory");
        let result = rt.transfer(&vault, &lp, &mallory, 1_000);
        assert!(matches!(result, Err(TallyError::Unauthorized(_))));
        let result = rt.approve(&vault, &lp, &mallory, 1_000);
        assert!(matches!(result, Err(TallyError::Unauthorized(_))));
        assert_eq!(rt.tokens().allowance(&lp, &vault, &mallory), 0);
        assert_eq!(rt.balance_of(&lp, &vault), 1_000);
        assert_eq!(rt.balance_of(&lp, &mallory), 0);

        // Ordinary accounts, including transfers into a vault, are unaffected.
        rt.mint_genesis(&lp, &mallory, 10).unwrap();
        rt.transfer(&mallory, &lp, &alice, 4).unwrap();
        assert_eq!(rt.balance_of(&lp, &alice), 4);
    }

    #[test]
    fn test_stable_asset_cannot_double_as_reward() {
        let mut config = RuntimeConfig::default();
        config.referral.reward_asset = "STABLE".to_string();
        assert!(matches!(
            Runtime::new(&config, 0),
            Err(TallyError::InvalidParameter(_))
        ));
    }
}
