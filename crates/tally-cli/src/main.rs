// crates/tally-cli/src/main.rs
//
// CLI entrypoint for the Tally developer tools.
//
// Every subcommand maps to one JSON-RPC method on tally-daemon. Mutating
// commands act as the account passed with `--caller`.

mod commands;
mod output;
mod rpc_client;

use clap::{Parser, Subcommand};
use commands::liquidity::LiquidityCmd;
use commands::referral::ReferralCmd;
use commands::rewards::RewardsCmd;
use commands::stable::StableCmd;
use commands::token::TokenCmd;
use commands::Context;
use output::OutputFormat;

/// Tally CLI: drive the accrual contracts hosted by tally-daemon.
#[derive(Parser, Debug)]
#[command(name = "tally", version = "0.1.0", about = "Tally accrual engine CLI")]
struct Cli {
    /// RPC endpoint for the tally-daemon.
    #[arg(long, global = true, default_value = "http://localhost:50051")]
    rpc: String,

    /// Account the command acts as.
    #[arg(long, global = true)]
    caller: Option<String>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Time-locked liquidity staking.
    #[command(subcommand)]
    Liquidity(LiquidityCmd),

    /// Over-collateralized stablecoin.
    #[command(subcommand)]
    Stable(StableCmd),

    /// Referral tree and task points.
    #[command(subcommand)]
    Referral(ReferralCmd),

    /// Staking and activity rewards.
    #[command(subcommand)]
    Rewards(RewardsCmd),

    /// Balances, approvals, transfers, and owner mints.
    #[command(subcommand)]
    Token(TokenCmd),

    /// Display daemon health, version, and runtime summary.
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let ctx = Context {
        rpc: cli.rpc.clone(),
        caller: cli.caller.clone(),
        output: cli.output,
    };

    match &cli.command {
        Commands::Liquidity(cmd) => commands::liquidity::run(cmd, &ctx).await?,
        Commands::Stable(cmd) => commands::stable::run(cmd, &ctx).await?,
        Commands::Referral(cmd) => commands::referral::run(cmd, &ctx).await?,
        Commands::Rewards(cmd) => commands::rewards::run(cmd, &ctx).await?,
        Commands::Token(cmd) => commands::token::run(cmd, &ctx).await?,
        Commands::Status => commands::status::run(&ctx).await?,
    }

    Ok(())
}
