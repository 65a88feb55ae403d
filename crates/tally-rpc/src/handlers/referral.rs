// crates/tally-rpc/src/handlers/referral.rs
//
// Referral and points handlers: Register, Award, Redeem, Claim, Inject,
// Fund, Pending, Member, SetPromo, SetStreak.
//
// Points are the stake of the referral accrual ledger: injected rewards
// are split across members by point balance.

use serde::{Deserialize, Serialize};

use tally_core::account::AccountId;
use tally_core::traits::Clock;
use tally_economics::points::{PromoWindow, StreakPolicy};
use tally_economics::referral::{MemberView, RedeemReceipt, TaskReceipt};

use super::{caller_id, rpc_error, SharedRuntime};

// ---------------------------------------------------------------------------
// Register
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub caller: String,
    /// The referring member, if any. Must already be registered.
    #[serde(default)]
    pub referrer: Option<String>,
}

/// A single upline bonus credited on registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UplineBonus {
    pub account: String,
    pub points: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub account: String,
    pub points: u64,
    /// Bonuses credited to up to three upline levels, nearest first.
    pub bonuses: Vec<UplineBonus>,
}

pub async fn handle_register(
    request: RegisterRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<RegisterResponse, String> {
    let caller = caller_id(request.caller)?;
    let referrer = request.referrer.map(AccountId::new);
    let mut rt = runtime.write().await;
    let now = clock.now();
    let receipt = rt
        .with_referral(|c, _, _| c.register(&caller, referrer.as_ref(), now))
        .map_err(rpc_error)?;

    Ok(RegisterResponse {
        account: caller.to_string(),
        points: receipt.points,
        bonuses: receipt
            .bonuses
            .into_iter()
            .map(|(account, points)| UplineBonus {
                account: account.to_string(),
                points,
            })
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Award
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardRequest {
    /// Authorized oracle submitting the completion.
    pub caller: String,
    pub account: String,
    pub base_points: u64,
    /// Task identifier; each tag is awarded at most once per account.
    pub task: String,
}

/// Handle an Award request. Oracle only.
pub async fn handle_award(
    request: AwardRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<TaskReceipt, String> {
    let caller = caller_id(request.caller)?;
    let account = AccountId::new(request.account);
    let mut rt = runtime.write().await;
    let now = clock.now();
    rt.with_referral(|c, _, access| {
        c.award_task(access, &caller, &account, request.base_points, &request.task, now)
    })
    .map_err(rpc_error)
}

// ---------------------------------------------------------------------------
// Redeem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemRequest {
    pub caller: String,
    pub points: u64,
}

pub async fn handle_redeem(
    request: RedeemRequest,
    runtime: &SharedRuntime,
) -> Result<RedeemReceipt, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    rt.with_referral(|c, tx, _| c.redeem(tx, &caller, request.points))
        .map_err(rpc_error)
}

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountResponse {
    pub account: String,
    pub amount: u64,
}

pub async fn handle_claim(
    request: CallerRequest,
    runtime: &SharedRuntime,
) -> Result<AmountResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let amount = rt
        .with_referral(|c, tx, _| c.claim(tx, &caller))
        .map_err(rpc_error)?;

    Ok(AmountResponse {
        account: caller.to_string(),
        amount,
    })
}

// ---------------------------------------------------------------------------
// Inject / Fund
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundRequest {
    pub caller: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectResponse {
    pub injected: u64,
    /// Total points sharing the injection.
    pub total_points: u128,
}

/// Handle an Inject request: distribute `amount` across current point holders.
pub async fn handle_inject(
    request: FundRequest,
    runtime: &SharedRuntime,
) -> Result<InjectResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    rt.with_referral(|c, tx, _| c.inject_rewards(tx, &caller, request.amount))
        .map_err(rpc_error)?;

    Ok(InjectResponse {
        injected: request.amount,
        total_points: rt.referral().ledger_state().total_weighted_stake,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundResponse {
    /// Reward units set aside for point redemptions.
    pub redemption_reserve: u64,
}

/// Handle a Fund request: top up the redemption reserve.
pub async fn handle_fund(
    request: FundRequest,
    runtime: &SharedRuntime,
) -> Result<FundResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let redemption_reserve = rt
        .with_referral(|c, tx, _| c.fund_redemptions(tx, &caller, request.amount))
        .map_err(rpc_error)?;

    Ok(FundResponse { redemption_reserve })
}

// ---------------------------------------------------------------------------
// Pending / Member
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRequest {
    pub account: String,
}

pub async fn handle_pending(
    request: AccountRequest,
    runtime: &SharedRuntime,
) -> Result<AmountResponse, String> {
    let account = AccountId::new(request.account);
    let rt = runtime.read().await;
    let amount = rt.referral().preview_pending(&account).map_err(rpc_error)?;

    Ok(AmountResponse {
        account: account.to_string(),
        amount,
    })
}

pub async fn handle_member(
    request: AccountRequest,
    runtime: &SharedRuntime,
) -> Result<MemberView, String> {
    let account = AccountId::new(request.account);
    let rt = runtime.read().await;
    rt.referral().member(&account).map_err(rpc_error)
}

// ---------------------------------------------------------------------------
// SetPromo / SetStreak
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetPromoRequest {
    pub caller: String,
    /// Window is `[start, end)` on the runtime clock.
    pub start: u64,
    pub end: u64,
    /// Percentage applied to task points inside the window (200 = double).
    pub multiplier_pct: u64,
}

/// Handle a SetPromo request. Owner only.
pub async fn handle_set_promo(
    request: SetPromoRequest,
    runtime: &SharedRuntime,
) -> Result<PromoWindow, String> {
    let caller = caller_id(request.caller)?;
    let promo = PromoWindow {
        start: request.start,
        end: request.end,
        multiplier_pct: request.multiplier_pct,
    };
    let mut rt = runtime.write().await;
    rt.with_referral(|c, _, access| c.set_promo_window(access, &caller, promo))
        .map_err(rpc_error)?;
    Ok(*rt.referral().promo_window())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStreakRequest {
    pub caller: String,
    /// Longest gap, in clock units, that keeps a streak going.
    pub window_secs: u64,
    pub per_task_bonus_pct: u64,
    pub max_bonus_pct: u64,
}

/// Handle a SetStreak request. Owner only.
pub async fn handle_set_streak(
    request: SetStreakRequest,
    runtime: &SharedRuntime,
) -> Result<StreakPolicy, String> {
    let caller = caller_id(request.caller)?;
    let policy = StreakPolicy {
        window_secs: request.window_secs,
        per_task_bonus_pct: request.per_task_bonus_pct,
        max_bonus_pct: request.max_bonus_pct,
    };
    let mut rt = runtime.write().await;
    rt.with_referral(|c, _, access| c.set_streak_policy(access, &caller, policy))
        .map_err(rpc_error)?;
    Ok(*rt.referral().streak_policy())
}
