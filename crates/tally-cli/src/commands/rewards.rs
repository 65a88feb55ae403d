// crates/tally-cli/src/commands/rewards.rs
//
// `tally rewards {stake, unstake, claim, activity, pending, set-emission}`.

use clap::Subcommand;
use serde_json::json;

use super::liquidity::account_or_caller;
use super::{call_and_print, Context, SECONDS_PER_DAY};

/// Reward manager subcommands.
#[derive(Debug, Subcommand)]
pub enum RewardsCmd {
    /// Stake for a number of days (needs an allowance for vault:rewards).
    Stake {
        #[arg(long)]
        amount: u64,
        #[arg(long)]
        days: u64,
    },
    /// Unstake after the lock expires.
    Unstake {
        #[arg(long)]
        amount: u64,
    },
    /// Claim staking and activity rewards.
    Claim,
    /// Record activity points for an account (oracle only).
    Activity {
        #[arg(long)]
        account: String,
        #[arg(long)]
        points: u64,
    },
    /// Show pending rewards per dimension.
    Pending {
        #[arg(long)]
        account: Option<String>,
    },
    /// Replace the emission schedule (owner only).
    SetEmission {
        /// Reward base units per second.
        #[arg(long)]
        rate: u64,
        /// Halving interval in days; flat when omitted.
        #[arg(long)]
        halving_days: Option<u64>,
        /// Share of emission going to stakers, in basis points.
        #[arg(long)]
        staking_share_bp: Option<u64>,
    },
}

/// Map a subcommand to its RPC method and params.
pub fn request(cmd: &RewardsCmd, ctx: &Context) -> Result<(&'static str, serde_json::Value), String> {
    let req = match cmd {
        RewardsCmd::Stake { amount, days } => (
            "rewards/stake",
            json!({
                "caller": ctx.caller()?,
                "amount": amount,
                "lock_duration_secs": days.saturating_mul(SECONDS_PER_DAY),
            }),
        ),
        RewardsCmd::Unstake { amount } => (
            "rewards/unstake",
            json!({ "caller": ctx.caller()?, "amount": amount }),
        ),
        RewardsCmd::Claim => ("rewards/claim", json!({ "caller": ctx.caller()? })),
        RewardsCmd::Activity { account, points } => (
            "rewards/activity",
            json!({ "caller": ctx.caller()?, "account": account, "points": points }),
        ),
        RewardsCmd::Pending { account } => (
            "rewards/pending",
            json!({ "account": account_or_caller(account, ctx)? }),
        ),
        RewardsCmd::SetEmission {
            rate,
            halving_days,
            staking_share_bp,
        } => (
            "rewards/set_emission",
            json!({
                "caller": ctx.caller()?,
                "rate_per_sec": rate,
                "halving_interval_secs": halving_days.map(|d| d.saturating_mul(SECONDS_PER_DAY)),
                "staking_share_bp": staking_share_bp,
            }),
        ),
    };
    Ok(req)
}

/// Run the rewards subcommand.
pub async fn run(cmd: &RewardsCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let (method, params) = request(cmd, ctx)?;
    call_and_print(ctx, method, params).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_context;

    #[test]
    fn test_set_emission_converts_halving_days() {
        let ctx = test_context(Some("owner"));
        let cmd = RewardsCmd::SetEmission {
            rate: 20,
            halving_days: Some(2),
            staking_share_bp: None,
        };
        let (method, params) = request(&cmd, &ctx).unwrap();
        assert_eq!(method, "rewards/set_emission");
        assert_eq!(params["halving_interval_secs"], json!(2 * SECONDS_PER_DAY));
        assert!(params["staking_share_bp"].is_null());
    }
}
