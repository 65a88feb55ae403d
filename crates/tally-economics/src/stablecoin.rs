// crates/tally-economics/src/stablecoin.rs
//
// Over-collateralized stablecoin with fee sharing.
//
// Users lock collateral and mint stable tokens against it up to
// `collateral * 10_000 / collateral_ratio_bp`. Each mint charges a fee in
// basis points; the fee is minted to the vault and shared among collateral
// providers pro rata to their collateral. The accrual mark of this ledger is
// the cumulative fee counter, so every fee injection moves the mark forward.
//
// Pending fee rewards are settled into each position's `unclaimed` balance
// whenever its collateral changes and paid out by `claim_rewards`.

use serde::{Deserialize, Serialize};

use tally_core::{apply_bp, ensure_owner, AccessControl, AccountId, Asset, TallyError, BP_DENOMINATOR};

use crate::accrual::{AccountPosition, AccrualLedger, GlobalAccrualState};
use crate::book::AccountBook;
use crate::health::{HealthReport, LiquidationOutcome, PositionHealthPolicy};
use crate::journal::Transaction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StablecoinConfig {
    #[serde(default = "default_collateral_asset")]
    pub collateral_asset: String,

    /// Minted and burned by the stablecoin vault only.
    #[serde(default = "default_stable_asset")]
    pub stable_asset: String,

    /// Minimum collateralization in basis points (15_000 = 150%).
    #[serde(default = "default_collateral_ratio_bp")]
    pub collateral_ratio_bp: u64,

    /// Collateral bonus for liquidators in basis points (500 = 5%).
    #[serde(default = "default_liquidation_discount_bp")]
    pub liquidation_discount_bp: u64,

    /// Fee charged on each mint, in basis points of the minted amount.
    #[serde(default = "default_mint_fee_bp")]
    pub mint_fee_bp: u64,
}

fn default_collateral_asset() -> String {
    "COLL".to_string()
}

fn default_stable_asset() -> String {
    "STABLE".to_string()
}

fn default_collateral_ratio_bp() -> u64 {
    crate::health::DEFAULT_COLLATERAL_RATIO_BP
}

fn default_liquidation_discount_bp() -> u64 {
    crate::health::DEFAULT_LIQUIDATION_DISCOUNT_BP
}

fn default_mint_fee_bp() -> u64 {
    50
}

impl Default for StablecoinConfig {
    fn default() -> Self {
        Self {
            collateral_asset: default_collateral_asset(),
            stable_asset: default_stable_asset(),
            collateral_ratio_bp: default_collateral_ratio_bp(),
            liquidation_discount_bp: default_liquidation_discount_bp(),
            mint_fee_bp: default_mint_fee_bp(),
        }
    }
}

/// Collateral, debt, and settled-but-unpaid fee rewards of one account.
///
/// `position.raw_amount` is the collateral; the accrual weight equals it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralPosition {
    pub position: AccountPosition,
    pub debt: u64,
    pub unclaimed: u64,
}

impl CollateralPosition {
    pub fn collateral(&self) -> u64 {
        self.position.raw_amount
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralView {
    pub collateral: u64,
    pub debt: u64,
    /// Settled and accrued fee rewards awaiting `claim_rewards`.
    pub claimable: u64,
}

/// Result of minting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    /// Stable tokens received by the caller.
    pub received: u64,
    pub fee: u64,
    pub debt: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stablecoin {
    vault: AccountId,
    collateral_asset: Asset,
    stable_asset: Asset,
    policy: PositionHealthPolicy,
    mint_fee_bp: u64,
    ledger: AccrualLedger,
    /// Sum of all mint fees so far; the accrual mark.
    cumulative_fees: u64,
    total_debt: u64,
    positions: AccountBook<CollateralPosition>,
}

impl Stablecoin {
    pub fn new(config: &StablecoinConfig) -> Result<Self, TallyError> {
        if config.collateral_asset == config.stable_asset {
            return Err(TallyError::InvalidParameter(
                "collateral_asset and stable_asset must differ".to_string(),
            ));
        }
        validate_fee(config.mint_fee_bp)?;
        Ok(Self {
            vault: AccountId::vault("stablecoin"),
            collateral_asset: Asset::new(config.collateral_asset.clone()),
            stable_asset: Asset::new(config.stable_asset.clone()),
            policy: PositionHealthPolicy::new(
                config.collateral_ratio_bp,
                config.liquidation_discount_bp,
            )?,
            mint_fee_bp: config.mint_fee_bp,
            ledger: AccrualLedger::new(0),
            cumulative_fees: 0,
            total_debt: 0,
            positions: AccountBook::new(),
        })
    }

    pub fn vault(&self) -> &AccountId {
        &self.vault
    }

    pub fn collateral_asset(&self) -> &Asset {
        &self.collateral_asset
    }

    pub fn stable_asset(&self) -> &Asset {
        &self.stable_asset
    }

    pub fn policy(&self) -> &PositionHealthPolicy {
        &self.policy
    }

    pub fn ledger_state(&self) -> &GlobalAccrualState {
        self.ledger.state()
    }

    pub fn cumulative_fees(&self) -> u64 {
        self.cumulative_fees
    }

    pub fn total_debt(&self) -> u64 {
        self.total_debt
    }

    /// Move pending fee rewards of `cp` into its `unclaimed` balance. Does not resync.
    fn settle_into_unclaimed(&self, cp: &mut CollateralPosition) -> Result<u64, TallyError> {
        let pending = self.ledger.settle(&cp.position)?;
        cp.unclaimed = cp
            .unclaimed
            .checked_add(pending)
            .ok_or(TallyError::Overflow("unclaimed fees"))?;
        Ok(pending)
    }

    /// Change the collateral of `cp` after settling it.
    fn set_collateral(&mut self, cp: &mut CollateralPosition, collateral: u64) -> Result<(), TallyError> {
        self.settle_into_unclaimed(cp)?;
        cp.position.raw_amount = collateral;
        self.ledger.reweight(&mut cp.position, collateral as u128)
    }

    pub fn deposit_collateral(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        amount: u64,
    ) -> Result<CollateralView, TallyError> {
        if amount == 0 {
            return Err(TallyError::ZeroAmount);
        }
        let mut cp = self.positions.get(caller);
        let collateral = cp
            .collateral()
            .checked_add(amount)
            .ok_or(TallyError::Overflow("collateral"))?;
        tx.transfer_from(&self.collateral_asset, &self.vault, caller, &self.vault, amount)?;
        self.set_collateral(&mut cp, collateral)?;
        *self.positions.entry(caller) = cp.clone();
        tracing::debug!(account = %caller, amount, collateral, "Collateral deposited");
        self.view_of(&cp)
    }

    /// Withdraw collateral; the remaining position must stay within its borrow limit.
    pub fn withdraw_collateral(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        amount: u64,
    ) -> Result<CollateralView, TallyError> {
        if amount == 0 {
            return Err(TallyError::ZeroAmount);
        }
        let mut cp = self.positions.get(caller);
        if amount > cp.collateral() {
            return Err(TallyError::InsufficientBalance {
                requested: amount,
                available: cp.collateral(),
            });
        }
        let collateral = cp.collateral() - amount;
        self.policy.ensure_healthy(collateral, cp.debt)?;

        self.set_collateral(&mut cp, collateral)?;
        tx.transfer(&self.collateral_asset, &self.vault, caller, amount)?;
        *self.positions.entry(caller) = cp.clone();
        tracing::debug!(account = %caller, amount, collateral, "Collateral withdrawn");
        self.view_of(&cp)
    }

    /// Borrow `amount` against collateral. The caller receives `amount - fee`
    /// and owes `amount`; the fee is shared among collateral providers.
    pub fn mint(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        amount: u64,
    ) -> Result<MintReceipt, TallyError> {
        if amount == 0 {
            return Err(TallyError::ZeroAmount);
        }
        let mut cp = self.positions.get(caller);
        let debt = cp
            .debt
            .checked_add(amount)
            .ok_or(TallyError::Overflow("debt"))?;
        self.policy.ensure_healthy(cp.collateral(), debt)?;

        let fee = apply_bp(amount, self.mint_fee_bp)?;
        let received = amount - fee;
        tx.mint(&self.stable_asset, &self.vault, caller, received)?;
        if fee > 0 {
            tx.mint(&self.stable_asset, &self.vault, &self.vault, fee)?;
            let cumulative = self
                .cumulative_fees
                .checked_add(fee)
                .ok_or(TallyError::Overflow("cumulative fees"))?;
            self.ledger.advance(cumulative, fee)?;
            self.cumulative_fees = cumulative;
        }

        cp.debt = debt;
        self.total_debt = self
            .total_debt
            .checked_add(amount)
            .ok_or(TallyError::Overflow("total debt"))?;
        *self.positions.entry(caller) = cp;
        tracing::debug!(account = %caller, amount, fee, debt, "Stable minted");
        Ok(MintReceipt { received, fee, debt })
    }

    /// Repay debt by burning stable tokens. Repayment is capped at the debt.
    ///
    /// Returns the amount actually repaid.
    pub fn repay(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        amount: u64,
    ) -> Result<u64, TallyError> {
        if amount == 0 {
            return Err(TallyError::ZeroAmount);
        }
        let mut cp = self.positions.get(caller);
        if cp.debt == 0 {
            return Err(TallyError::NotFound(format!("debt of {}", caller)));
        }
        let repaid = amount.min(cp.debt);
        tx.burn(&self.stable_asset, &self.vault, caller, repaid)?;
        cp.debt -= repaid;
        self.total_debt = self.total_debt.saturating_sub(repaid);
        *self.positions.entry(caller) = cp;
        tracing::debug!(account = %caller, repaid, "Debt repaid");
        Ok(repaid)
    }

    /// Repay part of an unhealthy position's debt and seize its collateral at a discount.
    ///
    /// The liquidator burns `repay_amount` stable tokens. The liquidated
    /// account keeps its accrued fee rewards as `unclaimed`.
    pub fn liquidate(
        &mut self,
        tx: &mut Transaction<'_>,
        liquidator: &AccountId,
        account: &AccountId,
        repay_amount: u64,
    ) -> Result<LiquidationOutcome, TallyError> {
        if liquidator == account {
            return Err(TallyError::InvalidParameter(
                "cannot liquidate your own position".to_string(),
            ));
        }
        let mut cp = self.positions.get(account);
        let outcome = self.policy.liquidate(cp.collateral(), cp.debt, repay_amount)?;

        tx.burn(&self.stable_asset, &self.vault, liquidator, outcome.repaid)?;
        self.set_collateral(&mut cp, outcome.collateral_after)?;
        let cleared = cp.debt - outcome.debt_after;
        cp.debt = outcome.debt_after;
        self.total_debt = self.total_debt.saturating_sub(cleared);
        tx.transfer(
            &self.collateral_asset,
            &self.vault,
            liquidator,
            outcome.collateral_seized,
        )?;
        *self.positions.entry(account) = cp;

        tracing::info!(
            %liquidator,
            %account,
            repaid = outcome.repaid,
            seized = outcome.collateral_seized,
            debt_after = outcome.debt_after,
            "Position liquidated"
        );
        Ok(outcome)
    }

    /// Pay out all fee rewards of `caller`.
    ///
    /// # Errors
    /// `NothingToClaim` when there is nothing to pay.
    pub fn claim_rewards(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
    ) -> Result<u64, TallyError> {
        let mut cp = self.positions.get(caller);
        let total = cp
            .unclaimed
            .checked_add(self.ledger.settle(&cp.position)?)
            .ok_or(TallyError::Overflow("unclaimed fees"))?;
        if total == 0 {
            return Err(TallyError::NothingToClaim);
        }
        tx.transfer(&self.stable_asset, &self.vault, caller, total)?;
        // Cleared only once the transfer went through.
        cp.unclaimed = 0;
        self.ledger.resync(&mut cp.position)?;
        *self.positions.entry(caller) = cp;
        tracing::debug!(account = %caller, paid = total, "Fee rewards claimed");
        Ok(total)
    }

    /// Settled plus accrued fee rewards of `account`.
    pub fn preview_pending(&self, account: &AccountId) -> Result<u64, TallyError> {
        let cp = self.positions.get(account);
        cp.unclaimed
            .checked_add(self.ledger.settle(&cp.position)?)
            .ok_or(TallyError::Overflow("unclaimed fees"))
    }

    pub fn position(&self, account: &AccountId) -> Result<CollateralView, TallyError> {
        self.view_of(&self.positions.get(account))
    }

    pub fn health(&self, account: &AccountId) -> Result<HealthReport, TallyError> {
        let cp = self.positions.get(account);
        self.policy.report(cp.collateral(), cp.debt)
    }

    fn view_of(&self, cp: &CollateralPosition) -> Result<CollateralView, TallyError> {
        let claimable = cp
            .unclaimed
            .checked_add(self.ledger.settle(&cp.position)?)
            .ok_or(TallyError::Overflow("unclaimed fees"))?;
        Ok(CollateralView {
            collateral: cp.collateral(),
            debt: cp.debt,
            claimable,
        })
    }

    /// Owner only. Existing positions may become liquidatable.
    pub fn set_collateral_ratio(
        &mut self,
        access: &dyn AccessControl,
        caller: &AccountId,
        collateral_ratio_bp: u64,
    ) -> Result<(), TallyError> {
        ensure_owner(access, caller)?;
        let policy = PositionHealthPolicy::new(collateral_ratio_bp, self.policy.liquidation_discount_bp)?;
        tracing::info!(
            previous = self.policy.collateral_ratio_bp,
            collateral_ratio_bp,
            "Collateral ratio updated"
        );
        self.policy = policy;
        Ok(())
    }

    pub fn set_mint_fee(
        &mut self,
        access: &dyn AccessControl,
        caller: &AccountId,
        mint_fee_bp: u64,
    ) -> Result<(), TallyError> {
        ensure_owner(access, caller)?;
        validate_fee(mint_fee_bp)?;
        self.mint_fee_bp = mint_fee_bp;
        Ok(())
    }
}

fn validate_fee(fee_bp: u64) -> Result<(), TallyError> {
    if fee_bp > BP_DENOMINATOR {
        return Err(TallyError::InvalidParameter(format!(
            "mint fee {}bp exceeds 100%",
            fee_bp
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::atomically;
    use crate::token::TokenBank;
    use tally_core::{RoleRegistry, TokenLedger};

    struct Harness {
        bank: TokenBank,
        contract: Stablecoin,
        roles: RoleRegistry,
    }

    impl Harness {
        fn new() -> Self {
            let owner = AccountId::new("owner");
            let contract = Stablecoin::new(&StablecoinConfig::default()).unwrap();
            let mut bank = TokenBank::new();
            let coll = Asset::new("COLL");
            bank.register_asset(coll.clone(), owner.clone()).unwrap();
            bank.register_asset(Asset::new("STABLE"), contract.vault().clone())
                .unwrap();
            for name in ["alice", "bob"] {
                let user = AccountId::new(name);
                bank.mint(&coll, &owner, &user, 10_000).unwrap();
                bank.approve(&coll, &user, contract.vault(), u64::MAX);
            }
            Self {
                bank,
                contract,
                roles: RoleRegistry::new(owner),
            }
        }

        fn run<R>(
            &mut self,
            op: impl FnOnce(&mut Stablecoin, &mut Transaction<'_>) -> Result<R, TallyError>,
        ) -> Result<R, TallyError> {
            atomically(&mut self.contract, &mut self.bank, op)
        }

        fn balance(&self, asset: &str, who: &str) -> u64 {
            self.bank.balance_of(&Asset::new(asset), &AccountId::new(who))
        }
    }

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn bob() -> AccountId {
        AccountId::new("bob")
    }

    #[test]
    fn test_mint_fee_shared_by_collateral() {
        let mut h = Harness::new();
        h.run(|c, tx| c.deposit_collateral(tx, &alice(), 3000)).unwrap();
        h.run(|c, tx| c.deposit_collateral(tx, &bob(), 2000)).unwrap();

        let receipt = h.run(|c, tx| c.mint(tx, &alice(), 2000)).unwrap();
        assert_eq!(receipt.fee, 10);
        assert_eq!(receipt.received, 1990);
        assert_eq!(h.balance("STABLE", "alice"), 1990);
        assert_eq!(h.contract.cumulative_fees(), 10);
        assert_eq!(h.contract.ledger_state().last_accrual_mark, 10);

        assert_eq!(h.contract.preview_pending(&alice()).unwrap(), 6);
        assert_eq!(h.contract.preview_pending(&bob()).unwrap(), 4);
    }

    #[test]
    fn test_mint_respects_borrow_limit() {
        let mut h = Harness::new();
        h.run(|c, tx| c.deposit_collateral(tx, &alice(), 1500)).unwrap();
        assert_eq!(
            h.run(|c, tx| c.mint(tx, &alice(), 1001)),
            Err(TallyError::Undercollateralized {
                debt: 1001,
                max_borrow: 1000
            })
        );
        h.run(|c, tx| c.mint(tx, &alice(), 1000)).unwrap();
        assert!(matches!(
            h.run(|c, tx| c.withdraw_collateral(tx, &alice(), 1)),
            Err(TallyError::Undercollateralized { .. })
        ));
    }

    #[test]
    fn test_repay_is_capped_at_debt() {
        let mut h = Harness::new();
        h.run(|c, tx| c.deposit_collateral(tx, &alice(), 1500)).unwrap();
        h.run(|c, tx| c.deposit_collateral(tx, &bob(), 1500)).unwrap();
        h.run(|c, tx| c.mint(tx, &alice(), 1000)).unwrap();
        h.run(|c, tx| c.mint(tx, &bob(), 100)).unwrap();
        // alice holds 995; bob hands her 95 more.
        h.bank
            .transfer(&Asset::new("STABLE"), &bob(), &alice(), 95)
            .unwrap();

        let repaid = h.run(|c, tx| c.repay(tx, &alice(), 5000)).unwrap();
        assert_eq!(repaid, 1000);
        assert_eq!(h.balance("STABLE", "alice"), 90);
        assert_eq!(h.contract.position(&alice()).unwrap().debt, 0);
        assert_eq!(h.contract.total_debt(), 100);
        assert!(h.run(|c, tx| c.repay(tx, &alice(), 1)).is_err());

        // Debt cleared: all collateral can leave.
        h.run(|c, tx| c.withdraw_collateral(tx, &alice(), 1500)).unwrap();
        assert_eq!(h.balance("COLL", "alice"), 10_000);
    }

    #[test]
    fn test_liquidation_after_ratio_increase() {
        let mut h = Harness::new();
        h.run(|c, tx| c.deposit_collateral(tx, &alice(), 1500)).unwrap();
        h.run(|c, tx| c.mint(tx, &alice(), 1000)).unwrap();
        h.run(|c, tx| c.deposit_collateral(tx, &bob(), 3000)).unwrap();
        h.run(|c, tx| c.mint(tx, &bob(), 400)).unwrap();

        assert!(matches!(
            h.run(|c, tx| c.liquidate(tx, &bob(), &alice(), 100)),
            Err(TallyError::NotLiquidatable { .. })
        ));

        let roles = h.roles.clone();
        h.contract
            .set_collateral_ratio(&roles, &AccountId::new("owner"), 20_000)
            .unwrap();
        assert!(h.contract.health(&alice()).unwrap().liquidatable);

        let alice_pending = h.contract.preview_pending(&alice()).unwrap();
        let bob_pending = h.contract.preview_pending(&bob()).unwrap();
        let bob_coll_before = h.balance("COLL", "bob");

        let outcome = h.run(|c, tx| c.liquidate(tx, &bob(), &alice(), 300)).unwrap();
        assert_eq!(outcome.collateral_seized, 315);
        assert_eq!(outcome.debt_after, 700);
        assert_eq!(h.balance("COLL", "bob"), bob_coll_before + 315);
        assert_eq!(h.balance("STABLE", "bob"), 398 - 300);

        let view = h.contract.position(&alice()).unwrap();
        assert_eq!(view.collateral, 1185);
        assert_eq!(view.debt, 700);
        // The liquidator does not inherit the liquidated account's rewards.
        assert_eq!(h.contract.preview_pending(&alice()).unwrap(), alice_pending);
        assert_eq!(h.contract.preview_pending(&bob()).unwrap(), bob_pending);
        assert_eq!(h.contract.ledger_state().total_weighted_stake, 1185 + 3000);
    }

    #[test]
    fn test_liquidator_without_funds_rolls_back() {
        let mut h = Harness::new();
        h.run(|c, tx| c.deposit_collateral(tx, &alice(), 1500)).unwrap();
        h.run(|c, tx| c.mint(tx, &alice(), 1000)).unwrap();
        let roles = h.roles.clone();
        h.contract
            .set_collateral_ratio(&roles, &AccountId::new("owner"), 20_000)
            .unwrap();
        let result = h.run(|c, tx| c.liquidate(tx, &bob(), &alice(), 300));
        assert!(matches!(result, Err(TallyError::Transfer(_))));
        assert_eq!(h.contract.position(&alice()).unwrap().collateral, 1500);
        assert_eq!(h.balance("COLL", "bob"), 10_000);
    }

    #[test]
    fn test_claim_rewards_clears_after_payment() {
        let mut h = Harness::new();
        assert_eq!(
            h.run(|c, tx| c.claim_rewards(tx, &alice())),
            Err(TallyError::NothingToClaim)
        );
        h.run(|c, tx| c.deposit_collateral(tx, &alice(), 4000)).unwrap();
        h.run(|c, tx| c.mint(tx, &alice(), 2000)).unwrap();
        // Sole provider: the whole 10 fee accrues to alice.
        let paid = h.run(|c, tx| c.claim_rewards(tx, &alice())).unwrap();
        assert_eq!(paid, 10);
        assert_eq!(h.balance("STABLE", "alice"), 1990 + 10);
        assert_eq!(h.contract.preview_pending(&alice()).unwrap(), 0);
        assert_eq!(
            h.run(|c, tx| c.claim_rewards(tx, &alice())),
            Err(TallyError::NothingToClaim)
        );
    }

    #[test]
    fn test_admin_setters_require_owner() {
        let mut h = Harness::new();
        let roles = h.roles.clone();
        assert!(h.contract.set_mint_fee(&roles, &alice(), 10).is_err());
        assert!(h
            .contract
            .set_mint_fee(&roles, &AccountId::new("owner"), 10_001)
            .is_err());
        h.contract
            .set_mint_fee(&roles, &AccountId::new("owner"), 0)
            .unwrap();
        h.run(|c, tx| c.deposit_collateral(tx, &alice(), 1500)).unwrap();
        let receipt = h.run(|c, tx| c.mint(tx, &alice(), 1000)).unwrap();
        assert_eq!(receipt.fee, 0);
        assert_eq!(h.contract.ledger_state().last_accrual_mark, 0);
    }
}
