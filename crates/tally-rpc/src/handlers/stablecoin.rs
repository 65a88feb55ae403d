// crates/tally-rpc/src/handlers/stablecoin.rs
//
// Stablecoin handlers: Deposit, Withdraw, Mint, Repay, Liquidate, Claim,
// Pending, Health, SetRatio.
//
// Collateral deposits pull through an allowance granted to the stablecoin
// vault. Mint fees are redistributed to collateral holders by weight.

use serde::{Deserialize, Serialize};

use tally_core::account::AccountId;
use tally_economics::health::{HealthReport, LiquidationOutcome};
use tally_economics::stablecoin::{CollateralView, MintReceipt};

use super::{caller_id, rpc_error, SharedRuntime};

/// A caller and an amount; shared by most stablecoin calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountRequest {
    pub caller: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralResponse {
    pub account: String,
    pub position: CollateralView,
}

// ---------------------------------------------------------------------------
// Deposit / Withdraw
// ---------------------------------------------------------------------------

pub async fn handle_deposit(
    request: AmountRequest,
    runtime: &SharedRuntime,
) -> Result<CollateralResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let position = rt
        .with_stablecoin(|c, tx, _| c.deposit_collateral(tx, &caller, request.amount))
        .map_err(rpc_error)?;

    Ok(CollateralResponse {
        account: caller.to_string(),
        position,
    })
}

/// Handle a Withdraw request. Rejected if the remaining collateral would not
/// cover the outstanding debt.
pub async fn handle_withdraw(
    request: AmountRequest,
    runtime: &SharedRuntime,
) -> Result<CollateralResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let position = rt
        .with_stablecoin(|c, tx, _| c.withdraw_collateral(tx, &caller, request.amount))
        .map_err(rpc_error)?;

    Ok(CollateralResponse {
        account: caller.to_string(),
        position,
    })
}

// ---------------------------------------------------------------------------
// Mint / Repay
// ---------------------------------------------------------------------------

pub async fn handle_mint(
    request: AmountRequest,
    runtime: &SharedRuntime,
) -> Result<MintReceipt, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    rt.with_stablecoin(|c, tx, _| c.mint(tx, &caller, request.amount))
        .map_err(rpc_error)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepayResponse {
    /// Amount actually burned; capped at the outstanding debt.
    pub repaid: u64,
    pub debt_after: u64,
}

pub async fn handle_repay(
    request: AmountRequest,
    runtime: &SharedRuntime,
) -> Result<RepayResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let repaid = rt
        .with_stablecoin(|c, tx, _| c.repay(tx, &caller, request.amount))
        .map_err(rpc_error)?;
    let debt_after = rt
        .stablecoin()
        .position(&caller)
        .map_err(rpc_error)?
        .debt;

    Ok(RepayResponse { repaid, debt_after })
}

// ---------------------------------------------------------------------------
// Liquidate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidateRequest {
    /// The liquidator; pays `repay_amount` of stable and receives collateral.
    pub caller: String,
    /// The undercollateralized account.
    pub account: String,
    pub repay_amount: u64,
}

pub async fn handle_liquidate(
    request: LiquidateRequest,
    runtime: &SharedRuntime,
) -> Result<LiquidationOutcome, String> {
    let liquidator = caller_id(request.caller)?;
    let account = AccountId::new(request.account);
    let mut rt = runtime.write().await;
    rt.with_stablecoin(|c, tx, _| c.liquidate(tx, &liquidator, &account, request.repay_amount))
        .map_err(rpc_error)
}

// ---------------------------------------------------------------------------
// Claim / Pending
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

/// Handle a Claim request: pay out accrued fee share in the stable asset.
pub async fn handle_claim(
    request: CallerRequest,
    runtime: &SharedRuntime,
) -> Result<AmountResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    let amount = rt
        .with_stablecoin(|c, tx, _| c.claim_rewards(tx, &caller))
        .map_err(rpc_error)?;

    Ok(AmountResponse {
        account: caller.to_string(),
        amount,
    })
}

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
    let amount = rt
        .stablecoin()
        .preview_pending(&account)
        .map_err(rpc_error)?;

    Ok(AmountResponse {
        account: account.to_string(),
        amount,
    })
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub account: String,
    pub report: HealthReport,
}

pub async fn handle_health(
    request: AccountRequest,
    runtime: &SharedRuntime,
) -> Result<HealthResponse, String> {
    let account = AccountId::new(request.account);
    let rt = runtime.read().await;
    let report = rt.stablecoin().health(&account).map_err(rpc_error)?;

    Ok(HealthResponse {
        account: account.to_string(),
        report,
    })
}

// ---------------------------------------------------------------------------
// SetRatio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRatioRequest {
    pub caller: String,
    /// Minimum collateral ratio in basis points (>= 10000).
    pub collateral_ratio_bp: u64,
    /// Optional new mint fee in basis points.
    #[serde(default)]
    pub mint_fee_bp: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRatioResponse {
    pub collateral_ratio_bp: u64,
    pub liquidation_discount_bp: u64,
}

/// Handle a SetRatio request. Owner only; both updates apply or neither.
pub async fn handle_set_ratio(
    request: SetRatioRequest,
    runtime: &SharedRuntime,
) -> Result<SetRatioResponse, String> {
    let caller = caller_id(request.caller)?;
    let mut rt = runtime.write().await;
    rt.with_stablecoin(|c, _, access| {
        c.set_collateral_ratio(access, &caller, request.collateral_ratio_bp)?;
        if let Some(fee) = request.mint_fee_bp {
            c.set_mint_fee(access, &caller, fee)?;
        }
        Ok(())
    })
    .map_err(rpc_error)?;

    let policy = rt.stablecoin().policy();
    Ok(SetRatioResponse {
        collateral_ratio_bp: policy.collateral_ratio_bp,
        liquidation_discount_bp: policy.liquidation_discount_bp,
    })
}
