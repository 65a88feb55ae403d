// crates/tally-rpc/src/lib.rs
//
// tally-rpc: JSON-RPC server and handlers for the Tally contracts.
//
// Provides a tonic-based server with one handler per contract operation.
// Requests are JSON `{method, params}` envelopes carried over tonic's
// HTTP transport rather than protobuf codegen.

pub mod handlers;
pub mod middleware;
pub mod server;

// Re-export the main server types for ergonomic access.
pub use handlers::{rpc_error, SharedRuntime};
pub use server::{JsonRpcRequest, JsonRpcResponse, RpcConfig, TallyRpcServer, TallyServiceImpl};
