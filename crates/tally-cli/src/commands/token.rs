// crates/tally-cli/src/commands/token.rs
//
// `tally token {balance, approve, transfer, mint}`.

use clap::Subcommand;
use serde_json::json;

use super::liquidity::account_or_caller;
use super::{call, call_and_print, Context};
use crate::output::{balance_rows, format_json, format_table, OutputFormat};

/// Token subcommands.
#[derive(Debug, Subcommand)]
pub enum TokenCmd {
    /// Show balances; all assets unless --asset is given.
    Balance {
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        asset: Option<String>,
    },
    /// Let a spender (usually a contract vault) pull tokens from the caller.
    Approve {
        #[arg(long)]
        asset: String,
        #[arg(long)]
        spender: String,
        #[arg(long)]
        amount: u64,
    },
    /// Send tokens to another account.
    Transfer {
        #[arg(long)]
        asset: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
    },
    /// Mint an owner-minted asset (owner only).
    Mint {
        #[arg(long)]
        asset: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
    },
}

/// Map a subcommand to its RPC method and params.
pub fn request(cmd: &TokenCmd, ctx: &Context) -> Result<(&'static str, serde_json::Value), String> {
    let req = match cmd {
        TokenCmd::Balance { account, asset } => (
            "token/balance",
            json!({ "account": account_or_caller(account, ctx)?, "asset": asset }),
        ),
        TokenCmd::Approve {
            asset,
            spender,
            amount,
        } => (
            "token/approve",
            json!({
                "caller": ctx.caller()?,
                "asset": asset,
                "spender": spender,
                "amount": amount,
            }),
        ),
        TokenCmd::Transfer { asset, to, amount } => (
            "token/transfer",
            json!({ "caller": ctx.caller()?, "asset": asset, "to": to, "amount": amount }),
        ),
        TokenCmd::Mint { asset, to, amount } => (
            "token/mint",
            json!({ "caller": ctx.caller()?, "asset": asset, "to": to, "amount": amount }),
        ),
    };
    Ok(req)
}

/// Run the token subcommand. Balances print as a table unless JSON is requested.
pub async fn run(cmd: &TokenCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let (method, params) = request(cmd, ctx)?;
    match (cmd, ctx.output) {
        (TokenCmd::Balance { .. }, OutputFormat::Table) => {
            let result = call(ctx, method, params).await?;
            let rows = balance_rows(&result);
            if rows.is_empty() {
                println!("{}", format_json(&result));
            } else {
                println!("Balances of {}", result["account"].as_str().unwrap_or_default());
                println!("{}", format_table(&rows));
            }
            Ok(())
        }
        _ => call_and_print(ctx, method, params).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_context;

    #[test]
    fn test_balance_without_asset_sends_null() {
        let ctx = test_context(Some("alice"));
        let cmd = TokenCmd::Balance {
            account: None,
            asset: None,
        };
        let (method, params) = request(&cmd, &ctx).unwrap();
        assert_eq!(method, "token/balance");
        assert_eq!(params["account"], json!("alice"));
        assert!(params["asset"].is_null());
    }
}
