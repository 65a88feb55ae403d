// crates/tally-cli/src/commands/referral.rs
//
// `tally referral {register, award, redeem, claim, inject, fund, pending, member,
// set-promo, set-streak}`.

use clap::Subcommand;
use serde_json::json;

use super::liquidity::account_or_caller;
use super::{call_and_print, Context};

/// Referral and points subcommands.
#[derive(Debug, Subcommand)]
pub enum ReferralCmd {
    /// Join the program, optionally under a referrer.
    Register {
        #[arg(long)]
        referrer: Option<String>,
    },
    /// Award task points to an account (oracle only).
    Award {
        #[arg(long)]
        account: String,
        #[arg(long)]
        points: u64,
        /// Task identifier; awarded once per account.
        #[arg(long)]
        task: String,
    },
    /// Burn points for reward tokens from the redemption reserve.
    Redeem {
        #[arg(long)]
        points: u64,
    },
    /// Claim rewards shared out by points.
    Claim,
    /// Share reward tokens across members by points.
    Inject {
        #[arg(long)]
        amount: u64,
    },
    /// Top up the redemption reserve.
    Fund {
        #[arg(long)]
        amount: u64,
    },
    /// Show pending rewards.
    Pending {
        #[arg(long)]
        account: Option<String>,
    },
    /// Show a member record.
    Member {
        #[arg(long)]
        account: Option<String>,
    },
    /// Set the promotional window [start, end) (owner only).
    SetPromo {
        #[arg(long)]
        start: u64,
        #[arg(long)]
        end: u64,
        /// Percentage applied inside the window (200 = double points).
        #[arg(long)]
        multiplier_pct: u64,
    },
    /// Set the activity streak policy (owner only).
    SetStreak {
        /// Longest gap between tasks that keeps a streak.
        #[arg(long)]
        window_secs: u64,
        #[arg(long)]
        bonus_pct: u64,
        #[arg(long)]
        max_bonus_pct: u64,
    },
}

/// Map a subcommand to its RPC method and params.
pub fn request(
    cmd: &ReferralCmd,
    ctx: &Context,
) -> Result<(&'static str, serde_json::Value), String> {
    let req = match cmd {
        ReferralCmd::Register { referrer } => (
            "referral/register",
            json!({ "caller": ctx.caller()?, "referrer": referrer }),
        ),
        ReferralCmd::Award {
            account,
            points,
            task,
        } => (
            "referral/award",
            json!({
                "caller": ctx.caller()?,
                "account": account,
                "base_points": points,
                "task": task,
            }),
        ),
        ReferralCmd::Redeem { points } => (
            "referral/redeem",
            json!({ "caller": ctx.caller()?, "points": points }),
        ),
        ReferralCmd::Claim => ("referral/claim", json!({ "caller": ctx.caller()? })),
        ReferralCmd::Inject { amount } => (
            "referral/inject",
            json!({ "caller": ctx.caller()?, "amount": amount }),
        ),
        ReferralCmd::Fund { amount } => (
            "referral/fund",
            json!({ "caller": ctx.caller()?, "amount": amount }),
        ),
        ReferralCmd::Pending { account } => (
            "referral/pending",
            json!({ "account": account_or_caller(account, ctx)? }),
        ),
        ReferralCmd::Member { account } => (
            "referral/member",
            json!({ "account": account_or_caller(account, ctx)? }),
        ),
        ReferralCmd::SetPromo {
            start,
            end,
            multiplier_pct,
        } => (
            "referral/set_promo",
            json!({
                "caller": ctx.caller()?,
                "start": start,
                "end": end,
                "multiplier_pct": multiplier_pct,
            }),
        ),
        ReferralCmd::SetStreak {
            window_secs,
            bonus_pct,
            max_bonus_pct,
        } => (
            "referral/set_streak",
            json!({
                "caller": ctx.caller()?,
                "window_secs": window_secs,
                "per_task_bonus_pct": bonus_pct,
                "max_bonus_pct": max_bonus_pct,
            }),
        ),
    };
    Ok(req)
}

/// Run the referral subcommand.
pub async fn run(cmd: &ReferralCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let (method, params) = request(cmd, ctx)?;
    call_and_print(ctx, method, params).await
}
