// crates/tally-economics/src/rewards.rs
//
// Multi-dimensional reward manager.
//
// One emission schedule (with halving) is split every accrual interval
// between two independent accrual ledgers:
//   1. Staking:  `staking_share_bp` of the emission, shared by tier-weighted stake.
//   2. Activity: the remainder, shared by activity points reported by an oracle.
//
// A dimension with no weight forfeits its share of the interval; the other
// dimension still receives its own share.

use serde::{Deserialize, Serialize};

use tally_core::{
    apply_bp, ensure_oracle, ensure_owner, AccessControl, AccountId, Asset, TallyError,
    BP_DENOMINATOR,
};

use crate::accrual::{AccountPosition, AccrualLedger, GlobalAccrualState};
use crate::book::AccountBook;
use crate::emission::EmissionSchedule;
use crate::journal::Transaction;
use crate::liquidity::LockedPosition;
use crate::weighting::{effective_weight, LockTerms, LockTier, TierSchedule};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardManagerConfig {
    #[serde(default = "default_stake_asset")]
    pub stake_asset: String,

    #[serde(default = "default_reward_asset")]
    pub reward_asset: String,

    /// Reward base units emitted per second before any halving.
    #[serde(default = "default_emission_rate")]
    pub emission_rate_per_sec: u64,

    /// Seconds between halvings (default four years). Unset for a flat rate.
    #[serde(default = "default_halving_interval")]
    pub halving_interval_secs: Option<u64>,

    /// Share of each interval's emission for the staking dimension, in basis points.
    #[serde(default = "default_staking_share_bp")]
    pub staking_share_bp: u64,

    #[serde(default = "default_tiers")]
    pub tiers: Vec<LockTier>,
}

fn default_stake_asset() -> String {
    "LP".to_string()
}

fn default_reward_asset() -> String {
    "REWARD".to_string()
}

fn default_emission_rate() -> u64 {
    20
}

fn default_halving_interval() -> Option<u64> {
    Some(4 * 365 * crate::weighting::SECONDS_PER_DAY)
}

fn default_staking_share_bp() -> u64 {
    7_000
}

fn default_tiers() -> Vec<LockTier> {
    TierSchedule::default().tiers().to_vec()
}

impl Default for RewardManagerConfig {
    fn default() -> Self {
        Self {
            stake_asset: default_stake_asset(),
            reward_asset: default_reward_asset(),
            emission_rate_per_sec: default_emission_rate(),
            halving_interval_secs: default_halving_interval(),
            staking_share_bp: default_staking_share_bp(),
            tiers: default_tiers(),
        }
    }
}

/// An account's standing in both dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAccount {
    pub staking: LockedPosition,
    /// `raw_amount` holds the activity points.
    pub activity: AccountPosition,
    /// Rewards settled by oracle updates, paid on the next claim.
    pub unclaimed: u64,
}

/// Pending rewards per dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBreakdown {
    pub staking: u64,
    pub activity: u64,
    pub unclaimed: u64,
}

impl PendingBreakdown {
    pub fn total(&self) -> Result<u64, TallyError> {
        self.staking
            .checked_add(self.activity)
            .and_then(|sum| sum.checked_add(self.unclaimed))
            .ok_or(TallyError::Overflow("pending rewards"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAccountView {
    pub staked: u64,
    pub staking_weight: u128,
    pub multiplier_bp: u64,
    pub lock_expiry: u64,
    pub activity_points: u64,
    /// Rewards paid out by the operation that produced this view.
    pub paid: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardManager {
    vault: AccountId,
    stake_asset: Asset,
    reward_asset: Asset,
    emission: EmissionSchedule,
    staking_share_bp: u64,
    tiers: TierSchedule,
    staking: AccrualLedger,
    activity: AccrualLedger,
    accounts: AccountBook<RewardAccount>,
}

impl RewardManager {
    pub fn new(config: &RewardManagerConfig, genesis: u64) -> Result<Self, TallyError> {
        if config.stake_asset == config.reward_asset {
            return Err(TallyError::InvalidParameter(
                "rewards stake_asset and reward_asset must differ".to_string(),
            ));
        }
        validate_share(config.staking_share_bp)?;
        Ok(Self {
            vault: AccountId::vault("rewards"),
            stake_asset: Asset::new(config.stake_asset.clone()),
            reward_asset: Asset::new(config.reward_asset.clone()),
            emission: schedule(config.emission_rate_per_sec, config.halving_interval_secs, genesis),
            staking_share_bp: config.staking_share_bp,
            tiers: TierSchedule::new(config.tiers.clone())?,
            staking: AccrualLedger::new(genesis),
            activity: AccrualLedger::new(genesis),
            accounts: AccountBook::new(),
        })
    }

    pub fn vault(&self) -> &AccountId {
        &self.vault
    }

    pub fn stake_asset(&self) -> &Asset {
        &self.stake_asset
    }

    pub fn reward_asset(&self) -> &Asset {
        &self.reward_asset
    }

    pub fn staking_state(&self) -> &GlobalAccrualState {
        self.staking.state()
    }

    pub fn activity_state(&self) -> &GlobalAccrualState {
        self.activity.state()
    }

    pub fn emission(&self) -> &EmissionSchedule {
        &self.emission
    }

    pub fn staking_share_bp(&self) -> u64 {
        self.staking_share_bp
    }

    /// Split `emission` into (staking, activity) parts.
    fn split(&self, emission: u64) -> Result<(u64, u64), TallyError> {
        let staking = apply_bp(emission, self.staking_share_bp)?;
        Ok((staking, emission - staking))
    }

    /// Advance both ledgers to `now`. They always share the same mark.
    fn accrue(&mut self, now: u64) -> Result<(), TallyError> {
        let from = self.staking.state().last_accrual_mark;
        let emission = self.emission.emission_between(from, now)?;
        let (staking_part, activity_part) = self.split(emission)?;
        self.staking.advance(now, staking_part)?;
        self.activity.advance(now, activity_part)?;
        Ok(())
    }

    fn pending_of(&self, account: &RewardAccount) -> Result<PendingBreakdown, TallyError> {
        Ok(PendingBreakdown {
            staking: self.staking.settle(&account.staking.position)?,
            activity: self.activity.settle(&account.activity)?,
            unclaimed: account.unclaimed,
        })
    }

    /// Pay everything owed to `owner` and mark it accounted for, except the
    /// staking checkpoint which the caller resyncs through `reweight`.
    fn pay_out(
        &self,
        tx: &mut Transaction<'_>,
        owner: &AccountId,
        account: &mut RewardAccount,
    ) -> Result<u64, TallyError> {
        let total = self.pending_of(account)?.total()?;
        if total > 0 {
            tx.transfer(&self.reward_asset, &self.vault, owner, total)?;
        }
        account.unclaimed = 0;
        self.activity.resync(&mut account.activity)?;
        Ok(total)
    }

    fn view(account: &RewardAccount, paid: u64) -> RewardAccountView {
        RewardAccountView {
            staked: account.staking.position.raw_amount,
            staking_weight: account.staking.position.weight,
            multiplier_bp: account.staking.multiplier_bp,
            lock_expiry: account.staking.lock_expiry,
            activity_points: account.activity.raw_amount,
            paid,
        }
    }

    /// Stake `amount` for `lock_duration` seconds. Pays all pending rewards first.
    pub fn stake(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        amount: u64,
        lock_duration: u64,
        now: u64,
    ) -> Result<RewardAccountView, TallyError> {
        if amount == 0 {
            return Err(TallyError::ZeroAmount);
        }
        let multiplier_bp = self.tiers.multiplier_for(lock_duration)?;
        let expiry = now
            .checked_add(lock_duration)
            .ok_or(TallyError::Overflow("lock expiry"))?;

        self.accrue(now)?;
        let mut account = self.accounts.get(caller);
        let paid = self.pay_out(tx, caller, &mut account)?;

        let current = LockTerms {
            raw_amount: account.staking.position.raw_amount,
            multiplier_bp: account.staking.multiplier_bp,
            lock_expiry: account.staking.lock_expiry,
        };
        let terms = current.combine(amount, multiplier_bp, expiry)?;
        tx.transfer_from(&self.stake_asset, &self.vault, caller, &self.vault, amount)?;

        account.staking.position.raw_amount = terms.raw_amount;
        account.staking.multiplier_bp = terms.multiplier_bp;
        account.staking.lock_expiry = terms.lock_expiry;
        self.staking
            .reweight(&mut account.staking.position, terms.weight()?)?;
        *self.accounts.entry(caller) = account.clone();

        tracing::debug!(account = %caller, amount, multiplier_bp = terms.multiplier_bp, paid, "Staked");
        Ok(Self::view(&account, paid))
    }

    /// Unstake `amount` once the lock has expired. Pays all pending rewards.
    pub fn unstake(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        amount: u64,
        now: u64,
    ) -> Result<RewardAccountView, TallyError> {
        if amount == 0 {
            return Err(TallyError::ZeroAmount);
        }
        let mut account = self.accounts.get(caller);
        let staked = account.staking.position.raw_amount;
        if amount > staked {
            return Err(TallyError::InsufficientBalance {
                requested: amount,
                available: staked,
            });
        }
        if now < account.staking.lock_expiry {
            return Err(TallyError::LockActive {
                unlocks_at: account.staking.lock_expiry,
                now,
            });
        }

        self.accrue(now)?;
        let paid = self.pay_out(tx, caller, &mut account)?;
        account.staking.position.raw_amount = staked - amount;
        let weight = effective_weight(staked - amount, account.staking.multiplier_bp)?;
        self.staking.reweight(&mut account.staking.position, weight)?;
        tx.transfer(&self.stake_asset, &self.vault, caller, amount)?;
        *self.accounts.entry(caller) = account.clone();

        tracing::debug!(account = %caller, amount, paid, "Unstaked");
        Ok(Self::view(&account, paid))
    }

    /// Pay staking, activity, and settled rewards.
    pub fn claim(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        now: u64,
    ) -> Result<PendingBreakdown, TallyError> {
        self.accrue(now)?;
        let mut account = self.accounts.get(caller);
        let breakdown = self.pending_of(&account)?;
        if breakdown.total()? == 0 {
            return Err(TallyError::NothingToClaim);
        }
        self.pay_out(tx, caller, &mut account)?;
        self.staking.resync(&mut account.staking.position)?;
        *self.accounts.entry(caller) = account;
        tracing::debug!(
            account = %caller,
            staking = breakdown.staking,
            activity = breakdown.activity,
            unclaimed = breakdown.unclaimed,
            "Rewards claimed"
        );
        Ok(breakdown)
    }

    /// Add activity points to `account`. Oracle only.
    ///
    /// The account's pending activity rewards are settled into `unclaimed`
    /// before its weight changes.
    pub fn record_activity(
        &mut self,
        access: &dyn AccessControl,
        caller: &AccountId,
        account_id: &AccountId,
        points: u64,
        now: u64,
    ) -> Result<u64, TallyError> {
        ensure_oracle(access, caller)?;
        if points == 0 {
            return Err(TallyError::ZeroAmount);
        }
        self.accrue(now)?;
        let mut account = self.accounts.get(account_id);
        let pending = self.activity.settle(&account.activity)?;
        account.unclaimed = account
            .unclaimed
            .checked_add(pending)
            .ok_or(TallyError::Overflow("unclaimed rewards"))?;
        let total = account
            .activity
            .raw_amount
            .checked_add(points)
            .ok_or(TallyError::Overflow("activity points"))?;
        account.activity.raw_amount = total;
        self.activity.reweight(&mut account.activity, total as u128)?;
        *self.accounts.entry(account_id) = account;

        tracing::debug!(account = %account_id, points, total, "Activity recorded");
        Ok(total)
    }

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

    /// Pending rewards per dimension as of `now`, without mutating anything.
    pub fn preview_pending(
        &self,
        account_id: &AccountId,
        now: u64,
    ) -> Result<PendingBreakdown, TallyError> {
        let from = self.staking.state().last_accrual_mark;
        let emission = self.emission.emission_between(from, now)?;
        let (staking_part, activity_part) = self.split(emission)?;
        let account = self.accounts.get(account_id);
        Ok(PendingBreakdown {
            staking: self
                .staking
                .preview(now, staking_part, &account.staking.position)?,
            activity: self.activity.preview(now, activity_part, &account.activity)?,
            unclaimed: account.unclaimed,
        })
    }

    pub fn account(&self, account_id: &AccountId) -> RewardAccountView {
        Self::view(&self.accounts.get(account_id), 0)
    }

    /// Replace the emission schedule. Owner only.
    ///
    /// Emission up to `now` is accrued under the old schedule; halvings of
    /// the new schedule count from `now`.
    pub fn set_emission(
        &mut self,
        access: &dyn AccessControl,
        caller: &AccountId,
        rate_per_sec: u64,
        halving_interval_secs: Option<u64>,
        now: u64,
    ) -> Result<(), TallyError> {
        ensure_owner(access, caller)?;
        self.accrue(now)?;
        self.emission = schedule(rate_per_sec, halving_interval_secs, now);
        tracing::info!(rate_per_sec, ?halving_interval_secs, "Emission schedule replaced");
        Ok(())
    }

    /// Change the staking/activity split. Owner only; accrues at the old split first.
    pub fn set_staking_share(
        &mut self,
        access: &dyn AccessControl,
        caller: &AccountId,
        staking_share_bp: u64,
        now: u64,
    ) -> Result<(), TallyError> {
        ensure_owner(access, caller)?;
        validate_share(staking_share_bp)?;
        self.accrue(now)?;
        self.staking_share_bp = staking_share_bp;
        Ok(())
    }
}

fn schedule(rate_per_sec: u64, halving_interval: Option<u64>, genesis: u64) -> EmissionSchedule {
    match halving_interval {
        Some(interval) => EmissionSchedule::halving(rate_per_sec, interval, genesis),
        None => EmissionSchedule::flat(rate_per_sec),
    }
}

fn validate_share(share_bp: u64) -> Result<(), TallyError> {
    if share_bp > BP_DENOMINATOR {
        return Err(TallyError::InvalidParameter(format!(
            "staking share {}bp exceeds 100%",
            share_bp
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::atomically;
    use crate::token::TokenBank;
    use crate::weighting::SECONDS_PER_DAY;
    use tally_core::{RoleRegistry, TokenLedger};

    const YEAR: u64 = 365 * SECONDS_PER_DAY;

    struct Harness {
        bank: TokenBank,
        manager: RewardManager,
        roles: RoleRegistry,
    }

    impl Harness {
        fn with_config(config: RewardManagerConfig) -> Self {
            let owner = AccountId::new("owner");
            let manager = RewardManager::new(&config, 0).unwrap();
            let mut bank = TokenBank::new();
            let lp = Asset::new("LP");
            let reward = Asset::new("REWARD");
            bank.register_asset(lp.clone(), owner.clone()).unwrap();
            bank.register_asset(reward.clone(), owner.clone()).unwrap();
            bank.mint(&reward, &owner, manager.vault(), 1_000_000_000)
                .unwrap();
            let alice = AccountId::new("alice");
            bank.mint(&lp, &owner, &alice, 10_000).unwrap();
            bank.approve(&lp, &alice, manager.vault(), u64::MAX);
            Self {
                bank,
                manager,
                roles: RoleRegistry::with_oracles(owner, [AccountId::new("oracle")]),
            }
        }

        fn new() -> Self {
            Self::with_config(RewardManagerConfig {
                halving_interval_secs: None,
                ..RewardManagerConfig::default()
            })
        }

        fn run<R>(
            &mut self,
            op: impl FnOnce(&mut RewardManager, &mut Transaction<'_>) -> Result<R, TallyError>,
        ) -> Result<R, TallyError> {
            atomically(&mut self.manager, &mut self.bank, op)
        }

        fn record(&mut self, who: &str, points: u64, now: u64) -> Result<u64, TallyError> {
            let roles = self.roles.clone();
            self.manager.record_activity(
                &roles,
                &AccountId::new("oracle"),
                &AccountId::new(who),
                points,
                now,
            )
        }
    }

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn bob() -> AccountId {
        AccountId::new("bob")
    }

    #[test]
    fn test_emission_split_between_dimensions() {
        let mut h = Harness::new();
        h.run(|m, tx| m.stake(tx, &alice(), 1000, YEAR, 0)).unwrap();
        h.record("bob", 50, 0).unwrap();

        // 20/s for 10s: 140 to staking, 60 to activity.
        let alice_pending = h.manager.preview_pending(&alice(), 10).unwrap();
        let bob_pending = h.manager.preview_pending(&bob(), 10).unwrap();
        assert_eq!(alice_pending.staking, 140);
        assert_eq!(alice_pending.activity, 0);
        assert_eq!(bob_pending.activity, 60);
        assert_eq!(bob_pending.total().unwrap(), 60);
    }

    #[test]
    fn test_claim_pays_both_dimensions() {
        let mut h = Harness::new();
        h.run(|m, tx| m.stake(tx, &alice(), 1000, YEAR, 0)).unwrap();
        h.record("alice", 10, 0).unwrap();
        let breakdown = h.run(|m, tx| m.claim(tx, &alice(), 10)).unwrap();
        assert_eq!(breakdown.staking, 140);
        assert_eq!(breakdown.activity, 60);
        assert_eq!(h.bank.balance_of(&Asset::new("REWARD"), &alice()), 200);
        assert_eq!(
            h.run(|m, tx| m.claim(tx, &alice(), 10)),
            Err(TallyError::NothingToClaim)
        );
    }

    #[test]
    fn test_activity_update_settles_into_unclaimed() {
        let mut h = Harness::new();
        h.record("bob", 50, 0).unwrap();
        assert_eq!(h.record("bob", 50, 10).unwrap(), 100);
        let pending = h.manager.preview_pending(&bob(), 10).unwrap();
        // No stake at all: the staking share of the interval is forfeited.
        assert_eq!(pending.unclaimed, 60);
        assert_eq!(pending.activity, 0);
        assert_eq!(h.manager.staking_state().acc_per_share, 0);
    }

    #[test]
    fn test_record_activity_requires_oracle() {
        let mut h = Harness::new();
        let roles = h.roles.clone();
        let result = h
            .manager
            .record_activity(&roles, &alice(), &alice(), 10, 0);
        assert!(matches!(result, Err(TallyError::Unauthorized(_))));
        assert_eq!(h.record("bob", 0, 0), Err(TallyError::ZeroAmount));
    }

    #[test]
    fn test_halving_applies_to_both_dimensions() {
        let mut h = Harness::with_config(RewardManagerConfig {
            emission_rate_per_sec: 1_000,
            halving_interval_secs: Some(100),
            ..RewardManagerConfig::default()
        });
        h.run(|m, tx| m.stake(tx, &alice(), 1000, YEAR, 0)).unwrap();
        h.record("bob", 1, 0).unwrap();
        // 100s at 1000 + 50s at 500 = 125_000.
        let alice_pending = h.manager.preview_pending(&alice(), 150).unwrap();
        let bob_pending = h.manager.preview_pending(&bob(), 150).unwrap();
        assert_eq!(alice_pending.staking, 87_500);
        assert_eq!(bob_pending.activity, 37_500);
    }

    #[test]
    fn test_set_staking_share_accrues_old_split_first() {
        let mut h = Harness::new();
        h.run(|m, tx| m.stake(tx, &alice(), 1000, YEAR, 0)).unwrap();
        h.record("bob", 50, 0).unwrap();
        let roles = h.roles.clone();
        let owner = AccountId::new("owner");
        h.manager.set_staking_share(&roles, &owner, 10_000, 10).unwrap();
        assert_eq!(h.manager.preview_pending(&alice(), 20).unwrap().staking, 140 + 200);
        assert_eq!(h.manager.preview_pending(&bob(), 20).unwrap().activity, 60);
        assert!(h.manager.set_staking_share(&roles, &owner, 10_001, 20).is_err());
    }

    #[test]
    fn test_set_emission_accrues_old_rate_first() {
        let mut h = Harness::new();
        h.run(|m, tx| m.stake(tx, &alice(), 1000, YEAR, 0)).unwrap();
        let roles = h.roles.clone();
        h.manager
            .set_emission(&roles, &AccountId::new("owner"), 0, None, 10)
            .unwrap();
        assert_eq!(h.manager.preview_pending(&alice(), 1_000).unwrap().staking, 140);
        assert!(h
            .manager
            .set_emission(&roles, &alice(), 5, None, 20)
            .is_err());
    }

    #[test]
    fn test_unstake_after_lock() {
        let mut h = Harness::new();
        h.run(|m, tx| m.stake(tx, &alice(), 1000, 90 * SECONDS_PER_DAY, 0))
            .unwrap();
        assert!(matches!(
            h.run(|m, tx| m.unstake(tx, &alice(), 1000, 10)),
            Err(TallyError::LockActive { .. })
        ));
        let view = h
            .run(|m, tx| m.unstake(tx, &alice(), 1000, 90 * SECONDS_PER_DAY))
            .unwrap();
        assert_eq!(view.staked, 0);
        assert_eq!(view.staking_weight, 0);
        assert_eq!(view.paid, 14 * 90 * SECONDS_PER_DAY);
        assert_eq!(h.bank.balance_of(&Asset::new("LP"), &alice()), 10_000);
    }
}
