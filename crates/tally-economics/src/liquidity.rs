// crates/tally-economics/src/liquidity.rs
//
// Liquidity-lock incentive: LP tokens locked for a chosen tier earn a
// time-based reward emission pro rata to their tier-weighted amount.
//
// - Principal is pulled from the depositor with `transfer_from`; the
//   depositor must first approve the contract vault.
// - Principal can only be withdrawn once the lock expires.
// - `emergency_exit` returns principal regardless of the lock and forfeits
//   pending rewards; the forfeited rewards stay in the vault.
// - Rewards are paid from the vault's reward balance, topped up with
//   `fund_rewards`.

use serde::{Deserialize, Serialize};

use tally_core::{ensure_owner, AccessControl, AccountId, Asset, TallyError};

use crate::accrual::{AccountPosition, AccrualLedger, Advance, GlobalAccrualState};
use crate::book::AccountBook;
use crate::emission::EmissionSchedule;
use crate::journal::Transaction;
use crate::weighting::{effective_weight, LockTerms, LockTier, TierSchedule};

/// Parameters of the liquidity incentive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityConfig {
    /// Token locked by depositors.
    #[serde(default = "default_lp_asset")]
    pub lp_asset: String,

    /// Token paid out as rewards. Must differ from `lp_asset`.
    #[serde(default = "default_reward_asset")]
    pub reward_asset: String,

    /// Reward base units emitted per second across all depositors.
    #[serde(default = "default_reward_rate")]
    pub reward_rate_per_sec: u64,

    /// Seconds between emission halvings. Unset for a flat rate.
    #[serde(default)]
    pub halving_interval_secs: Option<u64>,

    /// Lock tiers. Defaults to 90d/180d/365d at 1.2x/1.5x/2.0x.
    #[serde(default = "default_tiers")]
    pub tiers: Vec<LockTier>,
}

fn default_lp_asset() -> String {
    "LP".to_string()
}

fn default_reward_asset() -> String {
    "REWARD".to_string()
}

fn default_reward_rate() -> u64 {
    10
}

fn default_tiers() -> Vec<LockTier> {
    TierSchedule::default().tiers().to_vec()
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            lp_asset: default_lp_asset(),
            reward_asset: default_reward_asset(),
            reward_rate_per_sec: default_reward_rate(),
            halving_interval_secs: None,
            tiers: default_tiers(),
        }
    }
}

/// A depositor's locked LP position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPosition {
    pub position: AccountPosition,
    pub multiplier_bp: u64,
    pub lock_expiry: u64,
}

impl LockedPosition {
    fn terms(&self) -> LockTerms {
        LockTerms {
            raw_amount: self.position.raw_amount,
            multiplier_bp: self.multiplier_bp,
            lock_expiry: self.lock_expiry,
        }
    }
}

/// Read-only view of a position, returned by operations and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPositionView {
    pub raw_amount: u64,
    pub weight: u128,
    pub multiplier_bp: u64,
    pub lock_expiry: u64,
    /// Rewards paid out by the operation that produced this view (0 for queries).
    pub rewards_paid: u64,
}

/// Result of an emergency exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitReceipt {
    pub principal_returned: u64,
    pub rewards_forfeited: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityIncentive {
    vault: AccountId,
    lp_asset: Asset,
    reward_asset: Asset,
    ledger: AccrualLedger,
    emission: EmissionSchedule,
    tiers: TierSchedule,
    positions: AccountBook<LockedPosition>,
}

impl LiquidityIncentive {
    /// Create the contract with its accrual clock starting at `genesis`.
    pub fn new(config: &LiquidityConfig, genesis: u64) -> Result<Self, TallyError> {
        if config.lp_asset == config.reward_asset {
            return Err(TallyError::InvalidParameter(
                "liquidity lp_asset and reward_asset must differ".to_string(),
            ));
        }
        let emission = match config.halving_interval_secs {
            Some(interval) => EmissionSchedule::halving(config.reward_rate_per_sec, interval, genesis),
            None => EmissionSchedule::flat(config.reward_rate_per_sec),
        };
        Ok(Self {
            vault: AccountId::vault("liquidity"),
            lp_asset: Asset::new(config.lp_asset.clone()),
            reward_asset: Asset::new(config.reward_asset.clone()),
            ledger: AccrualLedger::new(genesis),
            emission,
            tiers: TierSchedule::new(config.tiers.clone())?,
            positions: AccountBook::new(),
        })
    }

    pub fn vault(&self) -> &AccountId {
        &self.vault
    }

    pub fn lp_asset(&self) -> &Asset {
        &self.lp_asset
    }

    pub fn reward_asset(&self) -> &Asset {
        &self.reward_asset
    }

    pub fn ledger_state(&self) -> &GlobalAccrualState {
        self.ledger.state()
    }

    pub fn total_forfeited(&self) -> u128 {
        self.ledger.total_forfeited()
    }

    pub fn emission(&self) -> &EmissionSchedule {
        &self.emission
    }

    pub fn tiers(&self) -> &TierSchedule {
        &self.tiers
    }

    /// Fold the emission since the last mark into the accumulator.
    fn accrue(&mut self, now: u64) -> Result<Advance, TallyError> {
        let from = self.ledger.state().last_accrual_mark;
        let injected = self.emission.emission_between(from, now)?;
        self.ledger.advance(now, injected)
    }

    /// Pay the pending reward of `position` from the vault. Does not resync.
    fn pay_pending(
        &self,
        tx: &mut Transaction<'_>,
        account: &AccountId,
        position: &AccountPosition,
    ) -> Result<u64, TallyError> {
        let pending = self.ledger.settle(position)?;
        if pending > 0 {
            tx.transfer(&self.reward_asset, &self.vault, account, pending)?;
        }
        Ok(pending)
    }

    fn view(locked: &LockedPosition, rewards_paid: u64) -> LiquidityPositionView {
        LiquidityPositionView {
            raw_amount: locked.position.raw_amount,
            weight: locked.position.weight,
            multiplier_bp: locked.multiplier_bp,
            lock_expiry: locked.lock_expiry,
            rewards_paid,
        }
    }

    /// Lock `amount` LP for `lock_duration` seconds.
    ///
    /// Pending rewards are paid first. The tier multiplier of this deposit
    /// applies to the whole position only if it extends the lock.
    pub fn deposit(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        amount: u64,
        lock_duration: u64,
        now: u64,
    ) -> Result<LiquidityPositionView, TallyError> {
        if amount == 0 {
            return Err(TallyError::ZeroAmount);
        }
        let multiplier_bp = self.tiers.multiplier_for(lock_duration)?;
        let expiry = now
            .checked_add(lock_duration)
            .ok_or(TallyError::Overflow("lock expiry"))?;

        self.accrue(now)?;
        let mut locked = self.positions.get(caller);
        let paid = self.pay_pending(tx, caller, &locked.position)?;

        let terms = locked.terms().combine(amount, multiplier_bp, expiry)?;
        tx.transfer_from(&self.lp_asset, &self.vault, caller, &self.vault, amount)?;

        locked.position.raw_amount = terms.raw_amount;
        locked.multiplier_bp = terms.multiplier_bp;
        locked.lock_expiry = terms.lock_expiry;
        self.ledger.reweight(&mut locked.position, terms.weight()?)?;
        *self.positions.entry(caller) = locked.clone();

        tracing::debug!(
            account = %caller,
            amount,
            multiplier_bp = locked.multiplier_bp,
            lock_expiry = locked.lock_expiry,
            paid,
            "Liquidity deposited"
        );
        Ok(Self::view(&locked, paid))
    }

    /// Withdraw `amount` of unlocked principal, paying pending rewards.
    pub fn withdraw(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        amount: u64,
        now: u64,
    ) -> Result<LiquidityPositionView, TallyError> {
        if amount == 0 {
            return Err(TallyError::ZeroAmount);
        }
        let mut locked = self.positions.get(caller);
        if amount > locked.position.raw_amount {
            return Err(TallyError::InsufficientBalance {
                requested: amount,
                available: locked.position.raw_amount,
            });
        }
        if locked.terms().is_locked(now) {
            return Err(TallyError::LockActive {
                unlocks_at: locked.lock_expiry,
                now,
            });
        }

        self.accrue(now)?;
        let paid = self.pay_pending(tx, caller, &locked.position)?;

        locked.position.raw_amount -= amount;
        let weight = effective_weight(locked.position.raw_amount, locked.multiplier_bp)?;
        self.ledger.reweight(&mut locked.position, weight)?;
        tx.transfer(&self.lp_asset, &self.vault, caller, amount)?;
        *self.positions.entry(caller) = locked.clone();

        tracing::debug!(account = %caller, amount, paid, "Liquidity withdrawn");
        Ok(Self::view(&locked, paid))
    }

    /// Pay out pending rewards.
    ///
    /// # Errors
    /// `NothingToClaim` when nothing is pending.
    pub fn claim(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        now: u64,
    ) -> Result<u64, TallyError> {
        self.accrue(now)?;
        let mut locked = self.positions.get(caller);
        let paid = self.pay_pending(tx, caller, &locked.position)?;
        if paid == 0 {
            return Err(TallyError::NothingToClaim);
        }
        self.ledger.resync(&mut locked.position)?;
        *self.positions.entry(caller) = locked;
        tracing::debug!(account = %caller, paid, "Liquidity rewards claimed");
        Ok(paid)
    }

    /// Return all principal immediately, ignoring the lock and forfeiting pending rewards.
    pub fn emergency_exit(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        now: u64,
    ) -> Result<ExitReceipt, TallyError> {
        let mut locked = self.positions.get(caller);
        if locked.position.raw_amount == 0 {
            return Err(TallyError::NotFound(format!("liquidity position of {}", caller)));
        }
        self.accrue(now)?;
        let forfeited = self.ledger.settle(&locked.position)?;
        let principal = locked.position.raw_amount;

        self.ledger.reweight(&mut locked.position, 0)?;
        locked.position.raw_amount = 0;
        locked.multiplier_bp = 0;
        locked.lock_expiry = 0;
        tx.transfer(&self.lp_asset, &self.vault, caller, principal)?;
        *self.positions.entry(caller) = locked;

        tracing::warn!(account = %caller, principal, forfeited, "Emergency exit");
        Ok(ExitReceipt {
            principal_returned: principal,
            rewards_forfeited: forfeited,
        })
    }

    /// Move reward tokens from `caller` into the vault.
    pub fn fund_rewards(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError> {
        if amount == 0 {
            return Err(TallyError::ZeroAmount);
        }
        tx.transfer(&self.reward_asset, caller, &self.vault, amount)
    }

    /// Pending rewards of `account` as of `now`, without mutating anything.
    pub fn preview_pending(&self, account: &AccountId, now: u64) -> Result<u64, TallyError> {
        let from = self.ledger.state().last_accrual_mark;
        let injected = self.emission.emission_between(from, now)?;
        let locked = self.positions.get(account);
        self.ledger.preview(now, injected, &locked.position)
    }

    pub fn position(&self, account: &AccountId) -> LiquidityPositionView {
        Self::view(&self.positions.get(account), 0)
    }

    /// Change the base emission rate. Owner only.
    ///
    /// Emission up to `now` is accrued at the old rate first. Halvings keep
    /// counting from the original genesis.
    pub fn set_reward_rate(
        &mut self,
        access: &dyn AccessControl,
        caller: &AccountId,
        rate_per_sec: u64,
        now: u64,
    ) -> Result<(), TallyError> {
        ensure_owner(access, caller)?;
        self.accrue(now)?;
        let previous = self.emission.rate_per_sec;
        self.emission.rate_per_sec = rate_per_sec;
        tracing::info!(previous, rate_per_sec, "Liquidity reward rate updated");
        Ok(())
    }

    /// Replace the lock tiers for future deposits. Owner only.
    pub fn set_tier_schedule(
        &mut self,
        access: &dyn AccessControl,
        caller: &AccountId,
        tiers: Vec<LockTier>,
    ) -> Result<(), TallyError> {
        ensure_owner(access, caller)?;
        self.tiers = TierSchedule::new(tiers)?;
        tracing::info!(tiers = self.tiers.tiers().len(), "Lock tiers replaced");
        Ok(())
    }
}
