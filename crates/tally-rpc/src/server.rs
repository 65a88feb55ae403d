// crates/tally-rpc/src/server.rs
//
// RPC server setup: TallyRpcServer and RpcConfig.
//
// Uses a JSON-RPC-over-tonic approach. A single tonic service accepts
// JSON-encoded requests with a method field, dispatches to the appropriate
// handler, and returns JSON-encoded responses.
//
// Every handler runs against one shared runtime; mutating handlers hold
// its write lock for the duration of the operation.

use std::sync::Arc;
use std::time::Instant;

use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use tonic::transport::Server;
use tonic::Status;

use tally_core::clock::SystemClock;
use tally_core::traits::Clock;

use crate::handlers::{self, SharedRuntime};
use crate::middleware;

// ---------------------------------------------------------------------------
// RpcConfig
// ---------------------------------------------------------------------------

/// Configuration for the RPC server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50051,
        }
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC envelope
// ---------------------------------------------------------------------------

/// A JSON-RPC style request: method name plus method-specific params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Method name, e.g. "liquidity/deposit".
    pub method: String,
    /// Method parameters as a JSON object.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A JSON-RPC style response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub success: bool,
    pub result: Option<serde_json::Value>,
    /// `"<kind>: <message>"` on failure.
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// TallyRpcServer
// ---------------------------------------------------------------------------

/// The RPC server exposing the runtime's contracts.
pub struct TallyRpcServer {
    config: RpcConfig,
    runtime: SharedRuntime,
    clock: Arc<dyn Clock>,
    clock_mode: String,
    start_time: Option<Instant>,
}

impl TallyRpcServer {
    /// Create a new server over `runtime`, reading wall-clock time.
    pub fn new(config: RpcConfig, runtime: SharedRuntime) -> Self {
        Self {
            config,
            runtime,
            clock: Arc::new(SystemClock),
            clock_mode: "system".to_string(),
            start_time: None,
        }
    }

    /// Replace the clock, e.g. with a block-driven `ManualClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>, mode: impl Into<String>) -> Self {
        self.clock = clock;
        self.clock_mode = mode.into();
        self
    }

    /// Set the daemon start time for uptime calculation.
    pub fn with_start_time(mut self, st: Instant) -> Self {
        self.start_time = Some(st);
        self
    }

    /// Build the dispatcher without binding a socket.
    pub fn service(&self) -> TallyServiceImpl {
        TallyServiceImpl {
            runtime: self.runtime.clone(),
            clock: self.clock.clone(),
            clock_mode: self.clock_mode.clone(),
            start_time: self.start_time,
        }
    }

    /// Start the RPC server and listen for requests.
    ///
    /// This binds to the configured address and serves requests until
    /// the process is terminated.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        tracing::info!("Tally RPC server starting on {}", addr);

        Server::builder()
            .accept_http1(true)
            .add_service(tonic::service::interceptor::InterceptedService::new(
                TallyJsonRpcServer::new(self.service()),
                middleware::logging_interceptor,
            ))
            .serve(addr)
            .await?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Holds the shared state and routes each JSON-RPC call to its handler.
#[derive(Clone)]
pub struct TallyServiceImpl {
    runtime: SharedRuntime,
    clock: Arc<dyn Clock>,
    clock_mode: String,
    start_time: Option<Instant>,
}

impl TallyServiceImpl {
    /// Dispatch a JSON-RPC request to the appropriate handler based on the method name.
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        use handlers::{liquidity, node, referral, rewards, stablecoin, token};

        let rt = &self.runtime;
        let clock = self.clock.as_ref();
        let params = request.params;

        let result = match request.method.as_str() {
            // Liquidity lock
            "liquidity/deposit" => {
                dispatch_handler(params, |r| liquidity::handle_deposit(r, rt, clock)).await
            }
            "liquidity/withdraw" => {
                dispatch_handler(params, |r| liquidity::handle_withdraw(r, rt, clock)).await
            }
            "liquidity/claim" => {
                dispatch_handler(params, |r| liquidity::handle_claim(r, rt, clock)).await
            }
            "liquidity/exit" => {
                dispatch_handler(params, |r| liquidity::handle_exit(r, rt, clock)).await
            }
            "liquidity/fund" => dispatch_handler(params, |r| liquidity::handle_fund(r, rt)).await,
            "liquidity/pending" => {
                dispatch_handler(params, |r| liquidity::handle_pending(r, rt, clock)).await
            }
            "liquidity/position" => {
                dispatch_handler(params, |r| liquidity::handle_position(r, rt)).await
            }
            "liquidity/set_rate" => {
                dispatch_handler(params, |r| liquidity::handle_set_rate(r, rt, clock)).await
            }
            "liquidity/set_tiers" => {
                dispatch_handler(params, |r| liquidity::handle_set_tiers(r, rt)).await
            }

            // Stablecoin
            "stable/deposit" => dispatch_handler(params, |r| stablecoin::handle_deposit(r, rt)).await,
            "stable/withdraw" => {
                dispatch_handler(params, |r| stablecoin::handle_withdraw(r, rt)).await
            }
            "stable/mint" => dispatch_handler(params, |r| stablecoin::handle_mint(r, rt)).await,
            "stable/repay" => dispatch_handler(params, |r| stablecoin::handle_repay(r, rt)).await,
            "stable/liquidate" => {
                dispatch_handler(params, |r| stablecoin::handle_liquidate(r, rt)).await
            }
            "stable/claim" => dispatch_handler(params, |r| stablecoin::handle_claim(r, rt)).await,
            "stable/pending" => dispatch_handler(params, |r| stablecoin::handle_pending(r, rt)).await,
            "stable/health" => dispatch_handler(params, |r| stablecoin::handle_health(r, rt)).await,
            "stable/set_ratio" => {
                dispatch_handler(params, |r| stablecoin::handle_set_ratio(r, rt)).await
            }

            // Referral and points
            "referral/register" => {
                dispatch_handler(params, |r| referral::handle_register(r, rt, clock)).await
            }
            "referral/award" => {
                dispatch_handler(params, |r| referral::handle_award(r, rt, clock)).await
            }
            "referral/redeem" => dispatch_handler(params, |r| referral::handle_redeem(r, rt)).await,
            "referral/claim" => dispatch_handler(params, |r| referral::handle_claim(r, rt)).await,
            "referral/inject" => dispatch_handler(params, |r| referral::handle_inject(r, rt)).await,
            "referral/fund" => dispatch_handler(params, |r| referral::handle_fund(r, rt)).await,
            "referral/pending" => {
                dispatch_handler(params, |r| referral::handle_pending(r, rt)).await
            }
            "referral/member" => dispatch_handler(params, |r| referral::handle_member(r, rt)).await,
            "referral/set_promo" => {
                dispatch_handler(params, |r| referral::handle_set_promo(r, rt)).await
            }
            "referral/set_streak" => {
                dispatch_handler(params, |r| referral::handle_set_streak(r, rt)).await
            }

            // Multi-dimensional rewards
            "rewards/stake" => {
                dispatch_handler(params, |r| rewards::handle_stake(r, rt, clock)).await
            }
            "rewards/unstake" => {
                dispatch_handler(params, |r| rewards::handle_unstake(r, rt, clock)).await
            }
            "rewards/claim" => {
                dispatch_handler(params, |r| rewards::handle_claim(r, rt, clock)).await
            }
            "rewards/activity" => {
                dispatch_handler(params, |r| rewards::handle_activity(r, rt, clock)).await
            }
            "rewards/pending" => {
                dispatch_handler(params, |r| rewards::handle_pending(r, rt, clock)).await
            }
            "rewards/set_emission" => {
                dispatch_handler(params, |r| rewards::handle_set_emission(r, rt, clock)).await
            }

            // Tokens
            "token/balance" => dispatch_handler(params, |r| token::handle_balance(r, rt)).await,
            "token/approve" => dispatch_handler(params, |r| token::handle_approve(r, rt)).await,
            "token/transfer" => dispatch_handler(params, |r| token::handle_transfer(r, rt)).await,
            "token/mint" => dispatch_handler(params, |r| token::handle_mint(r, rt)).await,

            // Node
            "node/info" => {
                let mode = self.clock_mode.as_str();
                let start = self.start_time;
                dispatch_handler(params, |r| node::handle_get_node_info(r, rt, clock, mode, start))
                    .await
            }
            "node/health" => dispatch_handler(params, |r| node::handle_get_health(r, rt)).await,

            _ => Err(format!("Unknown method: {}", request.method)),
        };

        match result {
            Ok(value) => JsonRpcResponse {
                success: true,
                result: Some(value),
                error: None,
            },
            Err(err) => {
                tracing::debug!(method = %request.method, error = %err, "RPC call failed");
                JsonRpcResponse {
                    success: false,
                    result: None,
                    error: Some(err),
                }
            }
        }
    }
}

/// Generic dispatch helper: deserialize params into a request type,
/// call the handler, and serialize the result to JSON.
///
/// A `null` params value is treated as an empty object so that methods
/// without arguments can omit it.
async fn dispatch_handler<Req, Resp, F, Fut>(
    params: serde_json::Value,
    handler: F,
) -> Result<serde_json::Value, String>
where
    Req: serde::de::DeserializeOwned,
    Resp: serde::Serialize,
    F: FnOnce(Req) -> Fut,
    Fut: std::future::Future<Output = Result<Resp, String>>,
{
    let params = if params.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        params
    };
    let request: Req = serde_json::from_value(params)
        .map_err(|e| format!("Failed to deserialize request: {}", e))?;
    let response = handler(request).await?;
    serde_json::to_value(response).map_err(|e| format!("Failed to serialize response: {}", e))
}

// ---------------------------------------------------------------------------
// Tonic Service Wiring
// ---------------------------------------------------------------------------
// A single service whose request and response bodies are raw JSON bytes
// (JsonRpcRequest / JsonRpcResponse). No proto codegen.

/// The tonic service wrapper. Implements the low-level service
/// by accepting bytes, deserializing as JSON-RPC, and dispatching.
#[derive(Clone)]
pub struct TallyJsonRpcServer {
    inner: TallyServiceImpl,
}

impl std::fmt::Debug for TallyJsonRpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TallyJsonRpcServer").finish()
    }
}

impl TallyJsonRpcServer {
    fn new(inner: TallyServiceImpl) -> Self {
        Self { inner }
    }
}

impl tonic::server::NamedService for TallyJsonRpcServer {
    const NAME: &'static str = "tally.rpc.TallyService";
}

impl<B> tower_service::Service<http::Request<B>> for TallyJsonRpcServer
where
    B: HttpBody + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    B::Data: Send,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let body = req.into_body();
            let body_bytes = match collect_body(body).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!("Failed to read request body: {}", e);
                    return Ok(error_response(format!("Failed to read request body: {}", e)));
                }
            };

            let rpc_request: JsonRpcRequest = match serde_json::from_slice(&body_bytes) {
                Ok(r) => r,
                Err(e) => {
                    return Ok(error_response(format!("Invalid JSON-RPC request: {}", e)));
                }
            };

            let rpc_response = inner.dispatch(rpc_request).await;
            let json = serde_json::to_vec(&rpc_response).unwrap_or_default();
            Ok(build_response(json))
        })
    }
}

/// Collect the body of an HTTP request into bytes.
async fn collect_body<B>(body: B) -> Result<Vec<u8>, String>
where
    B: HttpBody + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    B::Data: Send,
{
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    loop {
        match std::future::poll_fn(|cx| HttpBody::poll_frame(body.as_mut(), cx)).await {
            Some(Ok(frame)) => {
                if let Ok(data) = frame.into_data() {
                    use bytes::Buf;
                    collected.extend_from_slice(data.chunk());
                }
            }
            Some(Err(e)) => return Err(e.into().to_string()),
            None => break,
        }
    }

    Ok(collected)
}

fn error_response(message: String) -> http::Response<tonic::body::BoxBody> {
    let resp = JsonRpcResponse {
        success: false,
        result: None,
        error: Some(message),
    };
    build_response(serde_json::to_vec(&resp).unwrap_or_default())
}

/// Build an HTTP response with the given JSON body.
fn build_response(json: Vec<u8>) -> http::Response<tonic::body::BoxBody> {
    let body = tonic::body::BoxBody::new(
        http_body_util::Full::new(bytes::Bytes::from(json))
            .map_err(|e| Status::internal(format!("body error: {}", e))),
    );

    let mut response = http::Response::new(body);
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}
