// crates/tally-economics/src/referral.rs
//
// Referral and points program.
//
// Members earn points by registering (with an early-bird multiplier before a
// deadline), by referring others (a bonus for each of up to three upstream
// levels), and by completing tasks reported by an oracle. Points are the
// accrual weight: reward tokens injected into the program are shared pro
// rata to points. Points can also be redeemed for reward tokens from a
// separately funded redemption reserve.
//
// Every points change first settles the member's pending rewards into its
// `unclaimed` balance.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use tally_core::{ensure_oracle, ensure_owner, AccessControl, AccountId, Asset, TallyError};

use crate::accrual::{AccountPosition, AccrualLedger, GlobalAccrualState};
use crate::book::AccountBook;
use crate::cascade::upline;
use crate::journal::Transaction;
use crate::points::{task_points, PromoWindow, StreakPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralConfig {
    #[serde(default = "default_reward_asset")]
    pub reward_asset: String,

    /// Points granted on registration.
    #[serde(default = "default_base_points")]
    pub base_points: u64,

    /// Registrations strictly before this time get the early-bird multiplier.
    #[serde(default)]
    pub early_bird_deadline: u64,

    #[serde(default = "default_early_bird_multiplier_pct")]
    pub early_bird_multiplier_pct: u64,

    /// Bonus points for the referrer, its referrer, and the next one up.
    #[serde(default = "default_level_bonuses")]
    pub level_bonuses: Vec<u64>,

    #[serde(default)]
    pub promo: PromoWindow,

    #[serde(default)]
    pub streak: StreakPolicy,

    /// Points burned per reward base unit on redemption.
    #[serde(default = "default_points_per_reward_unit")]
    pub points_per_reward_unit: u64,
}

fn default_reward_asset() -> String {
    "REWARD".to_string()
}

fn default_base_points() -> u64 {
    100
}

fn default_early_bird_multiplier_pct() -> u64 {
    200
}

fn default_level_bonuses() -> Vec<u64> {
    vec![50, 25, 10]
}

fn default_points_per_reward_unit() -> u64 {
    10
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            reward_asset: default_reward_asset(),
            base_points: default_base_points(),
            early_bird_deadline: 0,
            early_bird_multiplier_pct: default_early_bird_multiplier_pct(),
            level_bonuses: default_level_bonuses(),
            promo: PromoWindow::default(),
            streak: StreakPolicy::default(),
            points_per_reward_unit: default_points_per_reward_unit(),
        }
    }
}

/// A program member. `position.raw_amount` holds the points balance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub registered: bool,
    /// Set once at registration, never changed.
    pub referrer: Option<AccountId>,
    pub registered_at: u64,
    pub position: AccountPosition,
    pub referral_count: u32,
    pub streak: u32,
    pub last_task_at: Option<u64>,
    pub completed_tasks: BTreeSet<String>,
    pub unclaimed: u64,
}

impl Member {
    pub fn points(&self) -> u64 {
        self.position.raw_amount
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberView {
    pub registered: bool,
    pub referrer: Option<AccountId>,
    pub points: u64,
    pub referral_count: u32,
    pub streak: u32,
    pub claimable: u64,
    pub completed_tasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub points: u64,
    /// Upstream accounts credited, nearest first, with their bonus.
    pub bonuses: Vec<(AccountId, u64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReceipt {
    pub points: u64,
    pub streak: u32,
    pub streak_bonus_pct: u64,
    pub window_pct: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemReceipt {
    pub points_burned: u64,
    pub paid: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralProgram {
    vault: AccountId,
    reward_asset: Asset,
    base_points: u64,
    early_bird_deadline: u64,
    early_bird_multiplier_pct: u64,
    level_bonuses: Vec<u64>,
    promo: PromoWindow,
    streak: StreakPolicy,
    points_per_reward_unit: u64,
    ledger: AccrualLedger,
    /// Sum of all injected rewards; the accrual mark.
    cumulative_injected: u64,
    redemption_reserve: u64,
    members: AccountBook<Member>,
}

impl ReferralProgram {
    pub fn new(config: &ReferralConfig) -> Result<Self, TallyError> {
        if config.points_per_reward_unit == 0 {
            return Err(TallyError::InvalidParameter(
                "points_per_reward_unit must be positive".to_string(),
            ));
        }
        validate_promo(&config.promo)?;
        validate_streak(&config.streak)?;
        Ok(Self {
            vault: AccountId::vault("referral"),
            reward_asset: Asset::new(config.reward_asset.clone()),
            base_points: config.base_points,
            early_bird_deadline: config.early_bird_deadline,
            early_bird_multiplier_pct: config.early_bird_multiplier_pct,
            level_bonuses: config.level_bonuses.clone(),
            promo: config.promo,
            streak: config.streak,
            points_per_reward_unit: config.points_per_reward_unit,
            ledger: AccrualLedger::new(0),
            cumulative_injected: 0,
            redemption_reserve: 0,
            members: AccountBook::new(),
        })
    }

    pub fn vault(&self) -> &AccountId {
        &self.vault
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

    pub fn redemption_reserve(&self) -> u64 {
        self.redemption_reserve
    }

    fn settle_into_unclaimed(&self, member: &mut Member) -> Result<(), TallyError> {
        let pending = self.ledger.settle(&member.position)?;
        member.unclaimed = member
            .unclaimed
            .checked_add(pending)
            .ok_or(TallyError::Overflow("unclaimed rewards"))?;
        Ok(())
    }

    fn set_points(&mut self, member: &mut Member, points: u64) -> Result<(), TallyError> {
        self.settle_into_unclaimed(member)?;
        member.position.raw_amount = points;
        self.ledger.reweight(&mut member.position, points as u128)
    }

    fn add_points(&mut self, member: &mut Member, points: u64) -> Result<(), TallyError> {
        let total = member
            .points()
            .checked_add(points)
            .ok_or(TallyError::Overflow("points"))?;
        self.set_points(member, total)
    }

    /// Register `caller`, optionally under `referrer`.
    ///
    /// Credits up to three upstream accounts with the level bonuses; the
    /// direct referrer's referral count goes up by one.
    pub fn register(
        &mut self,
        caller: &AccountId,
        referrer: Option<&AccountId>,
        now: u64,
    ) -> Result<RegistrationReceipt, TallyError> {
        if self.members.get_ref(caller).is_some_and(|m| m.registered) {
            return Err(TallyError::AlreadyRegistered(caller.clone()));
        }
        if let Some(referrer) = referrer {
            if referrer == caller {
                return Err(TallyError::SelfReferral);
            }
            if !self.members.get_ref(referrer).is_some_and(|m| m.registered) {
                return Err(TallyError::NotRegistered(referrer.clone()));
            }
        }

        let mut points = self.base_points;
        if now < self.early_bird_deadline {
            points = points
                .checked_mul(self.early_bird_multiplier_pct)
                .ok_or(TallyError::Overflow("registration points"))?
                / 100;
        }

        let mut member = Member {
            registered: true,
            referrer: referrer.cloned(),
            registered_at: now,
            ..Member::default()
        };
        self.add_points(&mut member, points)?;
        *self.members.entry(caller) = member;

        let mut bonuses = Vec::new();
        if let Some(referrer) = referrer {
            let levels = upline(referrer, |account| {
                self.members
                    .get_ref(account)
                    .and_then(|m| m.referrer.clone())
            });
            for (depth, account) in levels.into_iter().enumerate() {
                let bonus = self.level_bonuses.get(depth).copied().unwrap_or(0);
                let mut upstream = self.members.get(&account);
                if depth == 0 {
                    upstream.referral_count = upstream.referral_count.saturating_add(1);
                }
                if bonus > 0 {
                    self.add_points(&mut upstream, bonus)?;
                    bonuses.push((account.clone(), bonus));
                }
                *self.members.entry(&account) = upstream;
            }
        }

        tracing::debug!(
            account = %caller,
            referrer = ?referrer.map(|r| r.as_str()),
            points,
            levels = bonuses.len(),
            "Member registered"
        );
        Ok(RegistrationReceipt { points, bonuses })
    }

    /// Award task points to `account`. Oracle only; each tag once per account.
    pub fn award_task(
        &mut self,
        access: &dyn AccessControl,
        caller: &AccountId,
        account: &AccountId,
        base_points: u64,
        tag: &str,
        now: u64,
    ) -> Result<TaskReceipt, TallyError> {
        ensure_oracle(access, caller)?;
        if base_points == 0 {
            return Err(TallyError::ZeroAmount);
        }
        let mut member = self.members.get(account);
        if !member.registered {
            return Err(TallyError::NotRegistered(account.clone()));
        }
        if member.completed_tasks.contains(tag) {
            return Err(TallyError::TaskAlreadyCompleted {
                account: account.clone(),
                tag: tag.to_string(),
            });
        }

        let streak = self
            .streak
            .next_streak(member.streak, member.last_task_at, now);
        let streak_bonus_pct = self.streak.bonus_pct(streak);
        let window_pct = self.promo.multiplier_pct_at(now);
        let points = task_points(base_points, window_pct, streak_bonus_pct)?;

        self.add_points(&mut member, points)?;
        member.streak = streak;
        member.last_task_at = Some(now);
        member.completed_tasks.insert(tag.to_string());
        *self.members.entry(account) = member;

        tracing::debug!(%account, tag, points, streak, "Task points awarded");
        Ok(TaskReceipt {
            points,
            streak,
            streak_bonus_pct,
            window_pct,
        })
    }

    /// Burn whole multiples of `points_per_reward_unit` for reward tokens.
    pub fn redeem(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        points: u64,
    ) -> Result<RedeemReceipt, TallyError> {
        if points == 0 {
            return Err(TallyError::ZeroAmount);
        }
        let mut member = self.members.get(caller);
        if !member.registered {
            return Err(TallyError::NotRegistered(caller.clone()));
        }
        if points > member.points() {
            return Err(TallyError::InsufficientBalance {
                requested: points,
                available: member.points(),
            });
        }
        let paid = points / self.points_per_reward_unit;
        if paid == 0 {
            return Err(TallyError::InvalidParameter(format!(
                "redeeming needs at least {} points",
                self.points_per_reward_unit
            )));
        }
        if paid > self.redemption_reserve {
            return Err(TallyError::InsufficientBalance {
                requested: paid,
                available: self.redemption_reserve,
            });
        }
        let points_burned = paid * self.points_per_reward_unit;
        let remaining = member.points() - points_burned;

        self.set_points(&mut member, remaining)?;
        tx.transfer(&self.reward_asset, &self.vault, caller, paid)?;
        self.redemption_reserve -= paid;
        *self.members.entry(caller) = member;

        tracing::debug!(account = %caller, points_burned, paid, "Points redeemed");
        Ok(RedeemReceipt {
            points_burned,
            paid,
        })
    }

    /// Share `amount` reward tokens from `caller` among members by points.
    ///
    /// With no points outstanding the injection is forfeited.
    pub fn inject_rewards(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError> {
        if amount == 0 {
            return Err(TallyError::ZeroAmount);
        }
        tx.transfer(&self.reward_asset, caller, &self.vault, amount)?;
        let cumulative = self
            .cumulative_injected
            .checked_add(amount)
            .ok_or(TallyError::Overflow("cumulative injected"))?;
        self.ledger.advance(cumulative, amount)?;
        self.cumulative_injected = cumulative;
        tracing::debug!(from = %caller, amount, "Referral rewards injected");
        Ok(())
    }

    /// Add reward tokens from `caller` to the redemption reserve.
    pub fn fund_redemptions(
        &mut self,
        tx: &mut Transaction<'_>,
        caller: &AccountId,
        amount: u64,
    ) -> Result<u64, TallyError> {
        if amount == 0 {
            return Err(TallyError::ZeroAmount);
        }
        tx.transfer(&self.reward_asset, caller, &self.vault, amount)?;
        self.redemption_reserve = self
            .redemption_reserve
            .checked_add(amount)
            .ok_or(TallyError::Overflow("redemption reserve"))?;
        Ok(self.redemption_reserve)
    }

    pub fn claim(&mut self, tx: &mut Transaction<'_>, caller: &AccountId) -> Result<u64, TallyError> {
        let mut member = self.members.get(caller);
        self.settle_into_unclaimed(&mut member)?;
        let total = member.unclaimed;
        if total == 0 {
            return Err(TallyError::NothingToClaim);
        }
        tx.transfer(&self.reward_asset, &self.vault, caller, total)?;
        member.unclaimed = 0;
        self.ledger.resync(&mut member.position)?;
        *self.members.entry(caller) = member;
        tracing::debug!(account = %caller, paid = total, "Referral rewards claimed");
        Ok(total)
    }

    pub fn preview_pending(&self, account: &AccountId) -> Result<u64, TallyError> {
        let member = self.members.get(account);
        member
            .unclaimed
            .checked_add(self.ledger.settle(&member.position)?)
            .ok_or(TallyError::Overflow("unclaimed rewards"))
    }

    pub fn member(&self, account: &AccountId) -> Result<MemberView, TallyError> {
        let member = self.members.get(account);
        Ok(MemberView {
            registered: member.registered,
            referrer: member.referrer.clone(),
            points: member.points(),
            referral_count: member.referral_count,
            streak: member.streak,
            claimable: self.preview_pending(account)?,
            completed_tasks: member.completed_tasks.iter().cloned().collect(),
        })
    }

    pub fn set_promo_window(
        &mut self,
        access: &dyn AccessControl,
        caller: &AccountId,
        promo: PromoWindow,
    ) -> Result<(), TallyError> {
        ensure_owner(access, caller)?;
        validate_promo(&promo)?;
        self.promo = promo;
        tracing::info!(start = promo.start, end = promo.end, pct = promo.multiplier_pct, "Promo window set");
        Ok(())
    }

    pub fn set_streak_policy(
        &mut self,
        access: &dyn AccessControl,
        caller: &AccountId,
        streak: StreakPolicy,
    ) -> Result<(), TallyError> {
        ensure_owner(access, caller)?;
        validate_streak(&streak)?;
        self.streak = streak;
        tracing::info!(
            window_secs = streak.window_secs,
            per_task_bonus_pct = streak.per_task_bonus_pct,
            max_bonus_pct = streak.max_bonus_pct,
            "Streak policy set"
        );
        Ok(())
    }

    pub fn promo_window(&self) -> &PromoWindow {
        &self.promo
    }

    pub fn streak_policy(&self) -> &StreakPolicy {
        &self.streak
    }
}

fn validate_promo(promo: &PromoWindow) -> Result<(), TallyError> {
    if promo.start > promo.end {
        return Err(TallyError::InvalidParameter(format!(
            "promo window starts at {} after it ends at {}",
            promo.start, promo.end
        )));
    }
    Ok(())
}

fn validate_streak(streak: &StreakPolicy) -> Result<(), TallyError> {
    if streak.window_secs == 0 {
        return Err(TallyError::InvalidParameter(
            "streak window must be positive".to_string(),
        ));
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

    struct Harness {
        bank: TokenBank,
        program: ReferralProgram,
        roles: RoleRegistry,
    }

    impl Harness {
        fn with_config(config: ReferralConfig) -> Self {
            let owner = AccountId::new("owner");
            let mut bank = TokenBank::new();
            let reward = Asset::new("REWARD");
            bank.register_asset(reward.clone(), owner.clone()).unwrap();
            bank.mint(&reward, &owner, &AccountId::new("funder"), 1_000_000)
                .unwrap();
            Self {
                bank,
                program: ReferralProgram::new(&config).unwrap(),
                roles: RoleRegistry::with_oracles(owner, [AccountId::new("oracle")]),
            }
        }

        fn new() -> Self {
            Self::with_config(ReferralConfig::default())
        }

        fn run<R>(
            &mut self,
            op: impl FnOnce(&mut ReferralProgram, &mut Transaction<'_>) -> Result<R, TallyError>,
        ) -> Result<R, TallyError> {
            atomically(&mut self.program, &mut self.bank, op)
        }

        fn register(&mut self, who: &str, referrer: Option<&str>) -> RegistrationReceipt {
            let referrer = referrer.map(AccountId::new);
            self.program
                .register(&AccountId::new(who), referrer.as_ref(), 0)
                .unwrap()
        }

        fn award(&mut self, who: &str, base: u64, tag: &str, now: u64) -> Result<TaskReceipt, TallyError> {
            let roles = self.roles.clone();
            self.program.award_task(
                &roles,
                &AccountId::new("oracle"),
                &AccountId::new(who),
                base,
                tag,
                now,
            )
        }

        fn points(&self, who: &str) -> u64 {
            self.program.member(&AccountId::new(who)).unwrap().points
        }
    }

    #[test]
    fn test_cascade_stops_after_three_levels() {
        let mut h = Harness::new();
        h.register("A", None);
        h.register("B", Some("A"));
        h.register("C", Some("B"));
        h.register("D", Some("C"));

        let before: Vec<u64> = ["A", "B", "C", "D"].iter().map(|w| h.points(w)).collect();
        let receipt = h.register("E", Some("D"));
        let after: Vec<u64> = ["A", "B", "C", "D"].iter().map(|w| h.points(w)).collect();

        assert_eq!(receipt.points, 100);
        assert_eq!(
            receipt.bonuses,
            vec![
                (AccountId::new("D"), 50),
                (AccountId::new("C"), 25),
                (AccountId::new("B"), 10)
            ]
        );
        assert_eq!(after[0], before[0]);
        assert_eq!(after[1], before[1] + 10);
        assert_eq!(after[2], before[2] + 25);
        assert_eq!(after[3], before[3] + 50);
        assert_eq!(
            h.program.member(&AccountId::new("D")).unwrap().referral_count,
            1
        );
    }

    #[test]
    fn test_registration_preconditions() {
        let mut h = Harness::new();
        let alice = AccountId::new("alice");
        h.program.register(&alice, None, 0).unwrap();
        assert_eq!(
            h.program.register(&alice, None, 0),
            Err(TallyError::AlreadyRegistered(alice.clone()))
        );
        let bob = AccountId::new("bob");
        assert_eq!(
            h.program.register(&bob, Some(&bob), 0),
            Err(TallyError::SelfReferral)
        );
        let ghost = AccountId::new("ghost");
        assert_eq!(
            h.program.register(&bob, Some(&ghost), 0),
            Err(TallyError::NotRegistered(ghost))
        );
        assert!(!h.program.member(&bob).unwrap().registered);
    }

    #[test]
    fn test_early_bird_multiplier() {
        let mut h = Harness::with_config(ReferralConfig {
            early_bird_deadline: 100,
            ..ReferralConfig::default()
        });
        let early = h.program.register(&AccountId::new("early"), None, 99).unwrap();
        let late = h.program.register(&AccountId::new("late"), None, 100).unwrap();
        assert_eq!(early.points, 200);
        assert_eq!(late.points, 100);
    }

    #[test]
    fn test_streak_bonus_caps_at_fifty_percent() {
        let mut h = Harness::new();
        h.register("alice", None);
        let mut last = None;
        for i in 0..20u64 {
            last = Some(h.award("alice", 100, &format!("task-{}", i), 1_000 + i * 600).unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.streak, 20);
        assert_eq!(last.streak_bonus_pct, 50);
        assert_eq!(last.points, 150);

        // A gap longer than the window resets the streak.
        let reset = h.award("alice", 100, "late", 1_000 + 19 * 600 + SECONDS_PER_DAY + 1).unwrap();
        assert_eq!(reset.streak, 1);
        assert_eq!(reset.points, 100);
    }

    #[test]
    fn test_promo_window_then_streak_order() {
        let mut h = Harness::with_config(ReferralConfig {
            promo: PromoWindow {
                start: 0,
                end: 1_000,
                multiplier_pct: 150,
            },
            ..ReferralConfig::default()
        });
        h.register("alice", None);
        assert_eq!(h.award("alice", 7, "a", 10).unwrap().points, 10);
        // streak 2 -> 5%: 7 * 150 / 100 = 10, 10 * 105 / 100 = 10
        assert_eq!(h.award("alice", 7, "b", 20).unwrap().points, 10);
        assert_eq!(h.award("alice", 7, "c", 2_000).unwrap().window_pct, 100);
    }

    #[test]
    fn test_set_promo_window_is_owner_only_and_validated() {
        let mut h = Harness::new();
        let roles = h.roles.clone();
        let owner = AccountId::new("owner");
        let promo = PromoWindow {
            start: 100,
            end: 200,
            multiplier_pct: 200,
        };

        assert!(matches!(
            h.program.set_promo_window(&roles, &AccountId::new("oracle"), promo),
            Err(TallyError::Unauthorized(_))
        ));
        let inverted = PromoWindow {
            start: 300,
            end: 200,
            multiplier_pct: 200,
        };
        assert!(matches!(
            h.program.set_promo_window(&roles, &owner, inverted),
            Err(TallyError::InvalidParameter(_))
        ));
        assert_eq!(h.program.promo_window(), &PromoWindow::default());

        h.program.set_promo_window(&roles, &owner, promo).unwrap();
        h.register("alice", None);
        let inside = h.award("alice", 10, "inside", 150).unwrap();
        assert_eq!(inside.window_pct, 200);
        assert_eq!(inside.points, 20);
        // The window is half-open; the streak continues, so 5% applies.
        let after = h.award("alice", 10, "after", 200).unwrap();
        assert_eq!(after.window_pct, 100);
        assert_eq!(after.points, 10);
    }

    #[test]
    fn test_set_streak_policy_changes_window_and_bonus() {
        let mut h = Harness::new();
        let roles = h.roles.clone();
        let owner = AccountId::new("owner");
        let policy = StreakPolicy {
            window_secs: 60,
            per_task_bonus_pct: 20,
            max_bonus_pct: 30,
        };

        assert!(matches!(
            h.program.set_streak_policy(&roles, &AccountId::new("alice"), policy),
            Err(TallyError::Unauthorized(_))
        ));
        let no_window = StreakPolicy {
            window_secs: 0,
            ..policy
        };
        assert!(matches!(
            h.program.set_streak_policy(&roles, &owner, no_window),
            Err(TallyError::InvalidParameter(_))
        ));

        h.program.set_streak_policy(&roles, &owner, policy).unwrap();
        assert_eq!(h.program.streak_policy(), &policy);
        h.register("alice", None);
        h.award("alice", 100, "t1", 0).unwrap();
        let second = h.award("alice", 100, "t2", 60).unwrap();
        assert_eq!((second.streak, second.streak_bonus_pct, second.points), (2, 20, 120));
        let third = h.award("alice", 100, "t3", 120).unwrap();
        assert_eq!((third.streak, third.streak_bonus_pct, third.points), (3, 30, 130));
        // 61s is outside the new window.
        let reset = h.award("alice", 100, "t4", 181).unwrap();
        assert_eq!((reset.streak, reset.points), (1, 100));
    }

    #[test]
    fn test_award_task_guards() {
        let mut h = Harness::new();
        h.register("alice", None);
        h.award("alice", 10, "quest", 0).unwrap();
        assert_eq!(
            h.award("alice", 10, "quest", 1),
            Err(TallyError::TaskAlreadyCompleted {
                account: AccountId::new("alice"),
                tag: "quest".to_string()
            })
        );
        assert_eq!(
            h.award("nobody", 10, "quest", 1),
            Err(TallyError::NotRegistered(AccountId::new("nobody")))
        );
        let roles = h.roles.clone();
        let result = h.program.award_task(
            &roles,
            &AccountId::new("alice"),
            &AccountId::new("alice"),
            10,
            "self",
            1,
        );
        assert!(matches!(result, Err(TallyError::Unauthorized(_))));
    }

    #[test]
    fn test_injection_shared_by_points_and_settled_on_change() {
        let mut h = Harness::new();
        h.register("alice", None);
        h.register("bob", None);
        h.award("bob", 200, "t1", 0).unwrap();
        assert_eq!(h.points("bob"), 300);

        let funder = AccountId::new("funder");
        h.run(|p, tx| p.inject_rewards(tx, &funder, 400)).unwrap();
        let alice = AccountId::new("alice");
        assert_eq!(h.program.preview_pending(&alice).unwrap(), 100);
        assert_eq!(h.program.preview_pending(&AccountId::new("bob")).unwrap(), 300);

        // New points do not earn past injections; the old pending is kept.
        h.award("alice", 900, "t2", 0).unwrap();
        assert_eq!(h.program.preview_pending(&alice).unwrap(), 100);

        let paid = h.run(|p, tx| p.claim(tx, &alice)).unwrap();
        assert_eq!(paid, 100);
        assert_eq!(h.bank.balance_of(&Asset::new("REWARD"), &alice), 100);
        assert_eq!(
            h.run(|p, tx| p.claim(tx, &alice)),
            Err(TallyError::NothingToClaim)
        );
    }

    #[test]
    fn test_injection_without_points_is_forfeited() {
        let mut h = Harness::new();
        let funder = AccountId::new("funder");
        h.run(|p, tx| p.inject_rewards(tx, &funder, 50)).unwrap();
        assert_eq!(h.program.total_forfeited(), 50);
        h.register("alice", None);
        assert_eq!(h.program.preview_pending(&AccountId::new("alice")).unwrap(), 0);
    }

    #[test]
    fn test_redeem_burns_whole_units() {
        let mut h = Harness::new();
        h.register("alice", None);
        let alice = AccountId::new("alice");
        let funder = AccountId::new("funder");

        assert!(matches!(
            h.run(|p, tx| p.redeem(tx, &alice, 95)),
            Err(TallyError::InsufficientBalance { .. })
        ));
        h.run(|p, tx| p.fund_redemptions(tx, &funder, 50)).unwrap();

        let receipt = h.run(|p, tx| p.redeem(tx, &alice, 95)).unwrap();
        assert_eq!(receipt.points_burned, 90);
        assert_eq!(receipt.paid, 9);
        assert_eq!(h.points("alice"), 10);
        assert_eq!(h.program.redemption_reserve(), 41);
        assert!(h.run(|p, tx| p.redeem(tx, &alice, 9)).is_err());
        assert!(h.run(|p, tx| p.redeem(tx, &alice, 11)).is_err());
    }
}
