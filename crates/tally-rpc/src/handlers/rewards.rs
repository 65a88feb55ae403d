// crates/tally-rpc/src/handlers/rewards.rs
//
// Reward manager handlers: Stake, Unstake, Claim, Activity, Pending,
// SetEmission.
//
// Emission is split between the staking and activity dimensions; each
// dimension keeps its own accumulator.

use serde::{Deserialize, Serialize};

use tally_core::account::AccountId;
use tally_core::traits::Clock;
use tally_economics::rewards::{PendingBreakdown, RewardAccountView};

use super::{caller_id, rpc_error, SharedRuntime};

// ---------------------------------------------------------------------------
// Stake / Unstake
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeRequest {
    pub caller: String,
    pub amount: u64,
    pub lock_duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account: String,
    pub state: RewardAccountView,
}

pub async fn handle_stake(
    request: StakeRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<AccountResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let now = clock.now();
    let state = rt
        .with_rewards(|c, tx, _| c.stake(tx, &caller, request.amount, request.lock_duration_secs, now))
        .map_err(rpc_error)?;

    Ok(AccountResponse {
        account: caller.to_string(),
        state,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnstakeRequest {
    pub caller: String,
    pub amount: u64,
}

pub async fn handle_unstake(
    request: UnstakeRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<AccountResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let now = clock.now();
    let state = rt
        .with_rewards(|c, tx, _| c.unstake(tx, &caller, request.amount, now))
        .map_err(rpc_error)?;

    Ok(AccountResponse {
        account: caller.to_string(),
        state,
    })
}

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownResponse {
    pub account: String,
    pub breakdown: PendingBreakdown,
    pub total: u64,
}

/// Handle a Claim request: settle both dimensions and pay the sum.
pub async fn handle_claim(
    request: CallerRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<BreakdownResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let now = clock.now();
    let breakdown = rt
        .with_rewards(|c, tx, _| c.claim(tx, &caller, now))
        .map_err(rpc_error)?;
    let total = breakdown.total().map_err(rpc_error)?;

    Ok(BreakdownResponse {
        account: caller.to_string(),
        breakdown,
        total,
    })
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRequest {
    /// Authorized oracle reporting the activity.
    pub caller: String,
    pub account: String,
    pub points: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub account: String,
    /// Activity points held after recording.
    pub activity_points: u64,
}

pub async fn handle_activity(
    request: ActivityRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<ActivityResponse, String> {
    let caller = caller_id(request.caller)?;
    let account = AccountId::new(request.account);
    let mut rt = runtime.write().await;
    let now = clock.now();
    let activity_points = rt
        .with_rewards(|c, _, access| c.record_activity(access, &caller, &account, request.points, now))
        .map_err(rpc_error)?;

    Ok(ActivityResponse {
        account: account.to_string(),
        activity_points,
    })
}

// ---------------------------------------------------------------------------
// Pending
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRequest {
    pub account: String,
}

pub async fn handle_pending(
    request: AccountRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<BreakdownResponse, String> {
    let account = AccountId::new(request.account);
    let rt = runtime.read().await;
    let breakdown = rt
        .rewards()
        .preview_pending(&account, clock.now())
        .map_err(rpc_error)?;
    let total = breakdown.total().map_err(rpc_error)?;

    Ok(BreakdownResponse {
        account: account.to_string(),
        breakdown,
        total,
    })
}

// ---------------------------------------------------------------------------
// SetEmission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetEmissionRequest {
    pub caller: String,
    pub rate_per_sec: u64,
    /// Halving interval in seconds; omit for a flat rate.
    #[serde(default)]
    pub halving_interval_secs: Option<u64>,
    /// Optional new staking share in basis points.
    #[serde(default)]
    pub staking_share_bp: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetEmissionResponse {
    pub rate_per_sec: u64,
    pub halving_interval_secs: Option<u64>,
    pub staking_share_bp: u64,
    pub effective_from: u64,
}

/// Handle a SetEmission request. Owner only; accrues under the old schedule first.
pub async fn handle_set_emission(
    request: SetEmissionRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<SetEmissionResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let now = clock.now();
    rt.with_rewards(|c, _, access| {
        c.set_emission(
            access,
            &caller,
            request.rate_per_sec,
            request.halving_interval_secs,
            now,
        )?;
        if let Some(share) = request.staking_share_bp {
            c.set_staking_share(access, &caller, share, now)?;
        }
        Ok(())
    })
    .map_err(rpc_error)?;

    let rewards = rt.rewards();
    tracing::info!(
        rate = request.rate_per_sec,
        staking_share_bp = rewards.staking_share_bp(),
        now,
        "Reward emission updated"
    );
    Ok(SetEmissionResponse {
        rate_per_sec: request.rate_per_sec,
        halving_interval_secs: request.halving_interval_secs,
        staking_share_bp: rewards.staking_share_bp(),
        effective_from: now,
    })
}
