// crates/tally-cli/src/commands/stable.rs
//
// `tally stable {deposit, withdraw, mint, repay, liquidate, claim, pending, health, set-ratio}`.

use clap::Subcommand;
use serde_json::json;

use super::liquidity::account_or_caller;
use super::{call_and_print, Context};

/// Stablecoin subcommands.
#[derive(Debug, Subcommand)]
pub enum StableCmd {
    /// Deposit collateral (needs an allowance for vault:stablecoin).
    Deposit {
        #[arg(long)]
        amount: u64,
    },
    /// Withdraw collateral while staying within the borrow limit.
    Withdraw {
        #[arg(long)]
        amount: u64,
    },
    /// Borrow stable tokens against collateral. A mint fee is deducted.
    Mint {
        #[arg(long)]
        amount: u64,
    },
    /// Repay debt; capped at what is owed.
    Repay {
        #[arg(long)]
        amount: u64,
    },
    /// Repay part of an unhealthy account's debt for discounted collateral.
    Liquidate {
        /// The undercollateralized account.
        #[arg(long)]
        account: String,
        #[arg(long)]
        repay: u64,
    },
    /// Claim accrued mint-fee rewards.
    Claim,
    /// Show pending fee rewards.
    Pending {
        #[arg(long)]
        account: Option<String>,
    },
    /// Show collateral, debt, and liquidation status.
    Health {
        #[arg(long)]
        account: Option<String>,
    },
    /// Change the collateral ratio and optionally the mint fee (owner only).
    SetRatio {
        /// Basis points; 15000 = 150%.
        #[arg(long)]
        ratio_bp: u64,
        #[arg(long)]
        mint_fee_bp: Option<u64>,
    },
}

/// Map a subcommand to its RPC method and params.
pub fn request(cmd: &StableCmd, ctx: &Context) -> Result<(&'static str, serde_json::Value), String> {
    let req = match cmd {
        StableCmd::Deposit { amount } => (
            "stable/deposit",
            json!({ "caller": ctx.caller()?, "amount": amount }),
        ),
        StableCmd::Withdraw { amount } => (
            "stable/withdraw",
            json!({ "caller": ctx.caller()?, "amount": amount }),
        ),
        StableCmd::Mint { amount } => (
            "stable/mint",
            json!({ "caller": ctx.caller()?, "amount": amount }),
        ),
        StableCmd::Repay { amount } => (
            "stable/repay",
            json!({ "caller": ctx.caller()?, "amount": amount }),
        ),
        StableCmd::Liquidate { account, repay } => (
            "stable/liquidate",
            json!({ "caller": ctx.caller()?, "account": account, "repay_amount": repay }),
        ),
        StableCmd::Claim => ("stable/claim", json!({ "caller": ctx.caller()? })),
        StableCmd::Pending { account } => (
            "stable/pending",
            json!({ "account": account_or_caller(account, ctx)? }),
        ),
        StableCmd::Health { account } => (
            "stable/health",
            json!({ "account": account_or_caller(account, ctx)? }),
        ),
        StableCmd::SetRatio {
            ratio_bp,
            mint_fee_bp,
        } => (
            "stable/set_ratio",
            json!({
                "caller": ctx.caller()?,
                "collateral_ratio_bp": ratio_bp,
                "mint_fee_bp": mint_fee_bp,
            }),
        ),
    };
    Ok(req)
}

/// Run the stable subcommand.
pub async fn run(cmd: &StableCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let (method, params) = request(cmd, ctx)?;
    call_and_print(ctx, method, params).await
}
