// crates/tally-cli/src/commands/mod.rs
//
// Command module declarations for the Tally CLI, plus the shared call path:
// every subcommand maps to one RPC method and a JSON params object.

pub mod liquidity;
pub mod referral;
pub mod rewards;
pub mod stable;
pub mod status;
pub mod token;

use crate::output::{format_json, OutputFormat};
use crate::rpc_client::rpc_call;

/// Seconds per day, for `--days` lock arguments.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Global options every command needs.
#[derive(Debug, Clone)]
pub struct Context {
    pub rpc: String,
    pub caller: Option<String>,
    pub output: OutputFormat,
}

impl Context {
    /// The `--caller` account, required by every mutating command.
    pub fn caller(&self) -> Result<String, String> {
        self.caller
            .clone()
            .ok_or_else(|| "this command needs --caller <account>".to_string())
    }
}

/// Call `method` and return its result, turning a failed response into an error.
pub async fn call(
    ctx: &Context,
    method: &str,
    params: serde_json::Value,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let response = rpc_call(&ctx.rpc, method, params).await?;
    Ok(response.into_result()?)
}

/// Call `method` and print its result as JSON.
pub async fn call_and_print(
    ctx: &Context,
    method: &str,
    params: serde_json::Value,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = call(ctx, method, params).await?;
    println!("{}", format_json(&result));
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_context(caller: Option<&str>) -> Context {
    Context {
        rpc: "http://localhost:50051".to_string(),
        caller: caller.map(str::to_string),
        output: OutputFormat::Json,
    }
}
