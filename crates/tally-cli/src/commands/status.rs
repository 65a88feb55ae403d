// crates/tally-cli/src/commands/status.rs
//
// `tally status`: display daemon health, version, and runtime summary.

use serde_json::json;

use super::{call, Context};
use crate::output::format_json;

/// Run the status command.
pub async fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let info = call(ctx, "node/info", json!({})).await?;
    let health = call(ctx, "node/health", json!({})).await?;

    println!("Tally v{}", info["version"].as_str().unwrap_or("unknown"));
    println!();
    println!("Node Status");
    println!("-----------");
    println!("  RPC endpoint: {}", ctx.rpc);
    println!("  Health:       {}", health["status"].as_str().unwrap_or("unknown"));
    println!("  Clock:        {}", info["clock_mode"].as_str().unwrap_or("unknown"));
    println!("  Now:          {}", info["now"]);
    println!("  Uptime:       {}s", info["uptime_seconds"]);
    println!();
    println!("Runtime");
    println!("-------");
    println!("{}", format_json(&info["summary"]));

    Ok(())
}
