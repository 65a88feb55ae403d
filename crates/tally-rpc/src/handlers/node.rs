// crates/tally-rpc/src/handlers/node.rs
//
// Node info and health handlers: GetNodeInfo, GetHealth.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use tally_core::traits::Clock;
use tally_economics::RuntimeSummary;

use super::SharedRuntime;

// ---------------------------------------------------------------------------
// GetNodeInfo
// ---------------------------------------------------------------------------

/// Request for node information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetNodeInfoRequest {}

/// Response containing node information and a runtime summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetNodeInfoResponse {
    /// Software version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Clock source: "system" or "block".
    pub clock_mode: String,
    /// Current reading of the runtime clock.
    pub now: u64,
    pub summary: RuntimeSummary,
}

pub async fn handle_get_node_info(
    _request: GetNodeInfoRequest,
    runtime: &SharedRuntime,
    clock: &dyn Clock,
    clock_mode: &str,
    start_time: Option<Instant>,
) -> Result<GetNodeInfoResponse, String> {
    let rt = runtime.read().await;
    Ok(GetNodeInfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0),
        clock_mode: clock_mode.to_string(),
        now: clock.now(),
        summary: rt.summary(),
    })
}

// ---------------------------------------------------------------------------
// GetHealth
// ---------------------------------------------------------------------------

/// Request for node health status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetHealthRequest {}

/// Response containing node health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetHealthResponse {
    /// Overall health: "healthy" or "degraded".
    pub status: String,
    /// Whether the runtime lock could be taken without waiting.
    pub runtime_ok: bool,
    pub details: Option<String>,
}

/// Handle a GetHealth request.
///
/// Reports "degraded" when the runtime is currently held by a writer.
pub async fn handle_get_health(
    _request: GetHealthRequest,
    runtime: &SharedRuntime,
) -> Result<GetHealthResponse, String> {
    let runtime_ok = runtime.try_read().is_ok();
    let (status, details) = if runtime_ok {
        ("healthy", None)
    } else {
        ("degraded", Some("runtime busy with a write".to_string()))
    };

    Ok(GetHealthResponse {
        status: status.to_string(),
        runtime_ok,
        details,
    })
}
