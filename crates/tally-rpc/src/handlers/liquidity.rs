// crates/tally-rpc/src/handlers/liquidity.rs
//
// Liquidity lock handlers: Deposit, Withdraw, Claim, Exit, Fund,
// Pending, Position, SetRate, SetTiers.
//
// Deposits pull LP through an allowance granted to the liquidity vault
// (see token/approve).

use serde::{Deserialize, Serialize};

use tally_core::account::AccountId;
use tally_core::traits::Clock;
use tally_economics::liquidity::{ExitReceipt, LiquidityPositionView};
use tally_economics::weighting::LockTier;

use super::{caller_id, rpc_error, SharedRuntime};

// ---------------------------------------------------------------------------
// Deposit
// ---------------------------------------------------------------------------

/// Request to lock LP tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequest {
    pub caller: String,
    /// LP amount in base units.
    pub amount: u64,
    /// Lock duration in seconds. Must reach the shortest tier.
    pub lock_duration_secs: u64,
}

/// Response carrying the position after the deposit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionResponse {
    pub account: String,
    pub position: LiquidityPositionView,
}

pub async fn handle_deposit(
    request: DepositRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<PositionResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let now = clock.now();
    let position = rt
        .with_liquidity(|c, tx, _| {
            c.deposit(tx, &caller, request.amount, request.lock_duration_secs, now)
        })
        .map_err(rpc_error)?;

    Ok(PositionResponse {
        account: caller.to_string(),
        position,
    })
}

// ---------------------------------------------------------------------------
// Withdraw
// ---------------------------------------------------------------------------

/// Request to withdraw unlocked LP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub caller: String,
    pub amount: u64,
}

pub async fn handle_withdraw(
    request: WithdrawRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<PositionResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let now = clock.now();
    let position = rt
        .with_liquidity(|c, tx, _| c.withdraw(tx, &caller, request.amount, now))
        .map_err(rpc_error)?;

    Ok(PositionResponse {
        account: caller.to_string(),
        position,
    })
}

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

/// Request carrying only the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

/// Response for operations that pay out a single amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountResponse {
    pub account: String,
    pub amount: u64,
}

/// Handle a Claim request. Fails with `NothingToClaim` when nothing accrued.
pub async fn handle_claim(
    request: CallerRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<AmountResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let now = clock.now();
    let amount = rt
        .with_liquidity(|c, tx, _| c.claim(tx, &caller, now))
        .map_err(rpc_error)?;

    Ok(AmountResponse {
        account: caller.to_string(),
        amount,
    })
}

// ---------------------------------------------------------------------------
// Exit
// ---------------------------------------------------------------------------

/// Handle an emergency Exit: principal back, pending rewards forfeited.
pub async fn handle_exit(
    request: CallerRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<ExitReceipt, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let now = clock.now();
    rt.with_liquidity(|c, tx, _| c.emergency_exit(tx, &caller, now))
        .map_err(rpc_error)
}

// ---------------------------------------------------------------------------
// Fund
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundRequest {
    pub caller: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundResponse {
    /// Reward balance held by the vault after funding.
    pub vault_balance: u64,
}

/// Handle a Fund request: move reward tokens from the caller to the vault.
pub async fn handle_fund(
    request: FundRequest,
    runtime: &SharedRuntime,
) -> Result<FundResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    rt.with_liquidity(|c, tx, _| c.fund_rewards(tx, &caller, request.amount))
        .map_err(rpc_error)?;

    let liquidity = rt.liquidity();
    Ok(FundResponse {
        vault_balance: rt.balance_of(liquidity.reward_asset(), liquidity.vault()),
    })
}

// ---------------------------------------------------------------------------
// Pending / Position
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRequest {
    pub account: String,
}

/// Handle a Pending request. Read-only; never mutates the accumulator.
pub async fn handle_pending(
    request: AccountRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<AmountResponse, String> {
    let account = AccountId::new(request.account);
    let rt = runtime.read().await;
    let amount = rt
        .liquidity()
        .preview_pending(&account, clock.now())
        .map_err(rpc_error)?;

    Ok(AmountResponse {
        account: account.to_string(),
        amount,
    })
}

pub async fn handle_position(
    request: AccountRequest,
    runtime: &SharedRuntime,
) -> Result<PositionResponse, String> {
    let account = AccountId::new(request.account);
    let rt = runtime.read().await;
    Ok(PositionResponse {
        position: rt.liquidity().position(&account),
        account: account.to_string(),
    })
}

// ---------------------------------------------------------------------------
// SetRate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRateRequest {
    pub caller: String,
    pub rate_per_sec: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRateResponse {
    pub rate_per_sec: u64,
    /// Time at which the new rate took effect.
    pub effective_from: u64,
}

/// Handle a SetRate request. Owner only; accrues at the old rate first.
pub async fn handle_set_rate(
    request: SetRateRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
) -> Result<SetRateResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let now = clock.now();
    rt.with_liquidity(|c, _, access| c.set_reward_rate(access, &caller, request.rate_per_sec, now))
        .map_err(rpc_error)?;

    tracing::info!(rate = request.rate_per_sec, now, "Liquidity reward rate updated");
    Ok(SetRateResponse {
        rate_per_sec: request.rate_per_sec,
        effective_from: now,
    })
}

// ---------------------------------------------------------------------------
// SetTiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTiersRequest {
    pub caller: String,
    /// Replacement tiers, in any order.
    pub tiers: Vec<LockTier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTiersResponse {
    /// The schedule now in effect, shortest tier first.
    pub tiers: Vec<LockTier>,
}

/// Handle a SetTiers request. Owner only; existing positions keep their weight.
pub async fn handle_set_tiers(
    request: SetTiersRequest,
    runtime: &SharedRuntime,
) -> Result<SetTiersResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    rt.with_liquidity(|c, _, access| c.set_tier_schedule(access, &caller, request.tiers))
        .map_err(rpc_error)?;

    Ok(SetTiersResponse {
        tiers: rt.liquidity().tiers().tiers().to_vec(),
    })
}
