// crates/tally-daemon/src/shared.rs
//
// DaemonSharedState: the runtime and clock shared by the daemon's tasks.
//
// Constructed once in main.rs, then injected into the block scheduler and
// the RPC server via builder methods.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use tally_core::account::{AccountId, Asset};
use tally_core::clock::{ManualClock, SystemClock};
use tally_core::error::TallyError;
use tally_core::traits::Clock;
use tally_economics::Runtime;
use tally_rpc::SharedRuntime;

use crate::config::DaemonConfig;

/// Shared state for the daemon.
#[derive(Clone)]
pub struct DaemonSharedState {
    /// The serialized contract runtime.
    pub runtime: SharedRuntime,
    /// Clock every operation reads inside the runtime lock.
    pub clock: Arc<dyn Clock>,
    /// The block clock, present in block mode only.
    pub block_clock: Option<ManualClock>,
    /// "system" or "block".
    pub clock_mode: String,
    /// Daemon start time for uptime calculation.
    pub start_time: Instant,
}

impl DaemonSharedState {
    /// Select the clock, build the runtime at the clock's current reading,
    /// and mint the configured genesis balances.
    pub fn new(config: &DaemonConfig) -> Result<Self, TallyError> {
        let (clock, block_clock): (Arc<dyn Clock>, Option<ManualClock>) =
            match config.clock_mode.as_str() {
                "block" => {
                    let manual = ManualClock::new(config.start_block);
                    (Arc::new(manual.clone()), Some(manual))
                }
                _ => (Arc::new(SystemClock), None),
            };

        let genesis = clock.now();
        let mut runtime = Runtime::new(&config.runtime, genesis)?;

        for allocation in &config.genesis {
            let asset = Asset::new(allocation.asset.clone());
            let account = AccountId::new(allocation.account.clone());
            runtime.mint_genesis(&asset, &account, allocation.amount)?;
            tracing::info!(
                account = %account,
                asset = %asset,
                amount = allocation.amount,
                "Genesis balance minted"
            );
        }

        Ok(Self {
            runtime: Arc::new(RwLock::new(runtime)),
            clock,
            block_clock,
            clock_mode: config.clock_mode.clone(),
            start_time: Instant::now(),
        })
    }
}
