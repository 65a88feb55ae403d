// crates/tally-rpc/src/handlers/mod.rs
//
// Handler modules for all RPC endpoints.
// Each module defines request/response types and handler functions
// for a specific contract or API group.
//
// Mutating handlers hold the runtime write guard for the whole operation
// and read the clock inside it, so operations are applied in one total
// order and each observes the time at which it was applied.

use std::sync::Arc;

use tokio::sync::RwLock;

use tally_core::account::AccountId;
use tally_core::error::TallyError;
use tally_core::traits::ensure_not_vault;
use tally_economics::Runtime;

pub mod liquidity;
pub mod node;
pub mod referral;
pub mod rewards;
pub mod stablecoin;
pub mod token;

/// The runtime shared between the RPC server, the daemon, and tests.
pub type SharedRuntime = Arc<RwLock<Runtime>>;

/// Render a contract error as `"<kind>: <message>"` for the wire.
pub fn rpc_error(err: TallyError) -> String {
    format!("{}: {}", err.kind(), err)
}

/// The account a request acts as. Contract vaults are refused.
pub fn caller_id(caller: String) -> Result<AccountId, String> {
    let account = AccountId::new(caller);
    ensure_not_vault(&account).map_err(rpc_error)?;
    Ok(account)
}
