// crates/tally-cli/src/commands/liquidity.rs
//
// `tally liquidity {deposit, withdraw, claim, exit, fund, pending, position, set-rate,
// set-tiers}`.
//
// Deposits pull LP through an allowance; grant one first with
// `tally token approve --asset LP --spender vault:liquidity`.

use clap::Subcommand;
use serde_json::json;

use super::{call_and_print, Context, SECONDS_PER_DAY};

/// Liquidity lock subcommands.
#[derive(Debug, Subcommand)]
pub enum LiquidityCmd {
    /// Lock LP tokens for a number of days.
    Deposit {
        /// Amount in base units.
        #[arg(long)]
        amount: u64,
        /// Lock duration in days (90, 180, 365 by default).
        #[arg(long)]
        days: u64,
    },
    /// Withdraw unlocked LP tokens.
    Withdraw {
        #[arg(long)]
        amount: u64,
    },
    /// Claim accrued rewards.
    Claim,
    /// Take all principal back now, forfeiting pending rewards.
    Exit,
    /// Move reward tokens into the liquidity vault.
    Fund {
        #[arg(long)]
        amount: u64,
    },
    /// Show pending rewards without claiming.
    Pending {
        /// Account to inspect; defaults to --caller.
        #[arg(long)]
        account: Option<String>,
    },
    /// Show a locked position.
    Position {
        #[arg(long)]
        account: Option<String>,
    },
    /// Change the reward rate (owner only).
    SetRate {
        /// Reward base units per second.
        #[arg(long)]
        rate: u64,
    },
    /// Replace the lock tiers for future deposits (owner only).
    SetTiers {
        /// A tier as DAYS:MULTIPLIER_BP, e.g. 90:12000. Repeat for each tier.
        #[arg(long = "tier", value_parser = parse_tier, required = true)]
        tiers: Vec<(u64, u64)>,
    },
}

/// Parse `DAYS:MULTIPLIER_BP`.
fn parse_tier(s: &str) -> Result<(u64, u64), String> {
    let (days, bp) = s
        .split_once(':')
        .ok_or_else(|| format!("expected DAYS:MULTIPLIER_BP, got '{}'", s))?;
    let days = days
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("bad days '{}': {}", days, e))?;
    let bp = bp
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("bad multiplier '{}': {}", bp, e))?;
    Ok((days, bp))
}

/// Map a subcommand to its RPC method and params.
pub fn request(
    cmd: &LiquidityCmd,
    ctx: &Context,
) -> Result<(&'static str, serde_json::Value), String> {
    let req = match cmd {
        LiquidityCmd::Deposit { amount, days } => (
            "liquidity/deposit",
            json!({
                "caller": ctx.caller()?,
                "amount": amount,
                "lock_duration_secs": days.saturating_mul(SECONDS_PER_DAY),
            }),
        ),
        LiquidityCmd::Withdraw { amount } => (
            "liquidity/withdraw",
            json!({ "caller": ctx.caller()?, "amount": amount }),
        ),
        LiquidityCmd::Claim => ("liquidity/claim", json!({ "caller": ctx.caller()? })),
        LiquidityCmd::Exit => ("liquidity/exit", json!({ "caller": ctx.caller()? })),
        LiquidityCmd::Fund { amount } => (
            "liquidity/fund",
            json!({ "caller": ctx.caller()?, "amount": amount }),
        ),
        LiquidityCmd::Pending { account } => (
            "liquidity/pending",
            json!({ "account": account_or_caller(account, ctx)? }),
        ),
        LiquidityCmd::Position { account } => (
            "liquidity/position",
            json!({ "account": account_or_caller(account, ctx)? }),
        ),
        LiquidityCmd::SetRate { rate } => (
            "liquidity/set_rate",
            json!({ "caller": ctx.caller()?, "rate_per_sec": rate }),
        ),
        LiquidityCmd::SetTiers { tiers } => {
            let tiers: Vec<serde_json::Value> = tiers
                .iter()
                .map(|(days, bp)| {
                    json!({
                        "min_duration": days.saturating_mul(SECONDS_PER_DAY),
                        "multiplier_bp": bp,
                    })
                })
                .collect();
            (
                "liquidity/set_tiers",
                json!({ "caller": ctx.caller()?, "tiers": tiers }),
            )
        }
    };
    Ok(req)
}

/// `--account` if given, else `--caller`.
pub fn account_or_caller(account: &Option<String>, ctx: &Context) -> Result<String, String> {
    match account {
        Some(a) => Ok(a.clone()),
        None => ctx.caller(),
    }
}

/// Run the liquidity subcommand.
pub async fn run(cmd: &LiquidityCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let (method, params) = request(cmd, ctx)?;
    call_and_print(ctx, method, params).await
}
