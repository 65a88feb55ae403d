// crates/tally-rpc/src/middleware.rs
//
// Middleware for the RPC server: request logging.

use tonic::{Request, Status};

/// Logging interceptor for incoming RPC requests.
///
/// Logs the metadata of each request using the `tracing` crate. Method
/// names live in the JSON body and are logged by the dispatcher on failure.
pub fn logging_interceptor(req: Request<()>) -> Result<Request<()>, Status> {
    tracing::info!("Incoming RPC request: {:?}", req.metadata());
    Ok(req)
}
