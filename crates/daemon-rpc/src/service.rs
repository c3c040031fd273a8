//! Daemon RPC service: the HTTP JSON-RPC server.
//!
//! One POST endpoint (`/json_rpc`, also mounted at `/`) takes single or
//! batched JSON-RPC 2.0 requests. Handlers are synchronous and run on the
//! blocking pool so a slow engine call never stalls the reactor.

use crate::domain::config::RpcConfig;
use crate::domain::correlation::{CorrelationId, REQUEST_ID_HEADER};
use crate::domain::error::{codes, ApiError, GatewayError};
use crate::domain::methods::{is_method_supported, is_write_method};
use crate::domain::types::JsonRpcId;
use crate::metrics::{RequestTimer, RpcMetrics};
use crate::ports::{BlockchainEngine, MinerControl, NodeSession};
use crate::router::{route_method, AppState};
use crate::rpc::DaemonRpcHandlers;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn, Instrument};

/// Daemon RPC service state
pub struct DaemonRpcService {
    config: RpcConfig,
    rpc_handlers: Arc<DaemonRpcHandlers>,
    metrics: Arc<RpcMetrics>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl DaemonRpcService {
    /// Create the service over the node's components
    pub fn new(
        config: RpcConfig,
        engine: Arc<dyn BlockchainEngine>,
        session: Arc<dyn NodeSession>,
        miner: Arc<dyn MinerControl>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let rpc_handlers = Arc::new(DaemonRpcHandlers::new(&config, engine, session, miner));

        Ok(Self {
            config,
            rpc_handlers,
            metrics: Arc::new(RpcMetrics::new()),
            shutdown_tx: None,
        })
    }

    /// Bind the HTTP listener and serve in the background.
    ///
    /// Returns the bound address; port 0 in the config picks a free port.
    pub async fn start(&mut self) -> Result<SocketAddr, GatewayError> {
        if self.shutdown_tx.is_some() {
            return Err(GatewayError::Config("service already started".into()));
        }
        if !self.config.http.enabled {
            return Err(GatewayError::Config("HTTP server disabled".into()));
        }

        let listener = tokio::net::TcpListener::bind(self.config.http_addr())
            .await
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        let router = self.build_http_router();
        info!(%addr, "Starting daemon RPC server");
        tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                    info!("Received shutdown signal");
                })
                .await;
            if let Err(e) = served {
                error!(error = %e, "HTTP server error");
            }
            info!("Daemon RPC server stopped");
        });

        Ok(addr)
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<RpcMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Build HTTP router for JSON-RPC
    pub fn build_http_router(&self) -> Router {
        let state = ServiceState {
            app: AppState {
                rpc_handlers: Arc::clone(&self.rpc_handlers),
                metrics: Arc::clone(&self.metrics),
            },
            max_batch_size: self.config.limits.max_batch_size,
        };

        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(self.config.limits.max_request_size))
            .layer(TimeoutLayer::new(self.config.timeouts.request));

        Router::new()
            .route("/json_rpc", post(handle_json_rpc))
            .route("/", post(handle_json_rpc))
            .route("/health", get(health_check))
            .layer(DefaultBodyLimit::disable())
            .layer(middleware)
            .with_state(state)
    }
}

impl Drop for DaemonRpcService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Clone)]
struct ServiceState {
    app: AppState,
    max_batch_size: usize,
}

fn success(id: Option<Value>, result: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn failure(id: Option<Value>, error: &ApiError) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": error
    })
}

/// Handle JSON-RPC request
async fn handle_json_rpc(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let correlation_id = CorrelationId::from_header(
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    );
    let span = tracing::info_span!("json_rpc", request_id = %correlation_id);

    let (status, payload) = async {
        let request: Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Unparseable request body");
                return (
                    StatusCode::BAD_REQUEST,
                    failure(None, &ApiError::parse_error(e.to_string())),
                );
            }
        };

        let response = match request {
            Value::Array(requests) => process_batch(&state, requests).await,
            single => process_single_request(&state.app, single).await,
        };
        (StatusCode::OK, response)
    }
    .instrument(span)
    .await;

    let mut response = (status, Json(payload)).into_response();
    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Process a batch in order; the whole batch fails when it is too large.
async fn process_batch(state: &ServiceState, requests: Vec<Value>) -> Value {
    if requests.is_empty() {
        return failure(None, &ApiError::invalid_request("empty batch"));
    }
    if requests.len() > state.max_batch_size {
        state.app.metrics.record_batch(false);
        warn!(size = requests.len(), max = state.max_batch_size, "Batch rejected");
        let error = ApiError::limit_exceeded(
            format!("batch of {} requests", requests.len()),
            state.max_batch_size,
        );
        return failure(None, &error);
    }

    state.app.metrics.record_batch(true);
    let mut responses = Vec::with_capacity(requests.len());
    for request in requests {
        responses.push(process_single_request(&state.app, request).await);
    }
    Value::Array(responses)
}

/// Check the id of a request object.
fn validate_id(id: &Value) -> Result<(), ApiError> {
    let invalid = |reason: &str| {
        ApiError::new(
            codes::INVALID_REQUEST,
            format!("Invalid Request: {}", reason),
        )
    };

    if id.is_null() {
        return Err(invalid("null id (notifications not supported)"));
    }
    let parsed: JsonRpcId = serde_json::from_value(id.clone())
        .map_err(|_| invalid("id must be string or number"))?;
    parsed.validate().map_err(invalid)
}

/// Process a single JSON-RPC request
async fn process_single_request(state: &AppState, request: Value) -> Value {
    let id = request.get("id").cloned();

    if let Some(ref id_val) = id {
        if let Err(e) = validate_id(id_val) {
            return failure(None, &e);
        }
    }

    let Some(method) = request.get("method").and_then(|m| m.as_str()) else {
        return failure(id, &ApiError::invalid_request("missing method"));
    };
    if !is_method_supported(method) {
        state.metrics.record_request(false, false, 0);
        return failure(id, &ApiError::method_not_found(method));
    }

    let timer = RequestTimer::new(Arc::clone(&state.metrics), is_write_method(method));
    let method = method.to_string();
    let params = request.get("params").cloned();
    let worker_state = state.clone();

    let result = tokio::task::spawn_blocking(move || {
        route_method(&worker_state, &method, params.as_ref())
    })
    .await
    .unwrap_or_else(|e| {
        error!(error = %e, "Handler task failed");
        Err(ApiError::internal("handler task failed"))
    });

    timer.finish(result.is_ok());
    match result {
        Ok(value) => success(id, value),
        Err(e) => failure(id, &e),
    }
}

/// Health check endpoint
async fn health_check(State(state): State<ServiceState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "daemon-rpc",
        "version": env!("CARGO_PKG_VERSION"),
        "metrics": state.app.metrics.to_json()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryEngine, MockMiner, MockSession, TestAccount};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    fn service(config: RpcConfig) -> DaemonRpcService {
        let mut rng = StdRng::seed_from_u64(81);
        let miner = TestAccount::generate(&mut rng);
        let engine = Arc::new(InMemoryEngine::new(&miner.address(), 1_000, 19).unwrap());
        DaemonRpcService::new(
            config,
            engine,
            Arc::new(MockSession::new()),
            Arc::new(MockMiner::new()),
        )
        .unwrap()
    }

    async fn post_json(router: Router, path: &str, body: String) -> (StatusCode, HeaderMap, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = RpcConfig::default();
        config.limits.max_batch_size = 0;
        let mut rng = StdRng::seed_from_u64(82);
        let miner = TestAccount::generate(&mut rng);
        let engine = Arc::new(InMemoryEngine::new(&miner.address(), 1_000, 19).unwrap());
        let result = DaemonRpcService::new(
            config,
            engine,
            Arc::new(MockSession::new()),
            Arc::new(MockMiner::new()),
        );
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_id_validation() {
        assert!(validate_id(&json!(1)).is_ok());
        assert!(validate_id(&json!("abc")).is_ok());
        assert_eq!(
            validate_id(&Value::Null).unwrap_err().message,
            "Invalid Request: null id (notifications not supported)"
        );
        assert_eq!(
            validate_id(&json!({"a": 1})).unwrap_err().message,
            "Invalid Request: id must be string or number"
        );
        assert_eq!(validate_id(&json!("")).unwrap_err().code, codes::INVALID_REQUEST);
        assert_eq!(
            validate_id(&json!("x".repeat(257))).unwrap_err().code,
            codes::INVALID_REQUEST
        );
    }

    #[tokio::test]
    async fn test_single_request() {
        let svc = service(RpcConfig::default());
        let (status, headers, body) = post_json(
            svc.build_http_router(),
            "/json_rpc",
            json!({"jsonrpc": "2.0", "id": 7, "method": "getblockcount"}).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 7);
        assert_eq!(body["result"]["count"], 1);
        assert_eq!(body["result"]["status"], "OK");
        assert!(headers.contains_key(REQUEST_ID_HEADER));
        assert_eq!(svc.metrics().requests_success.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_caller_request_id_echoed() {
        let svc = service(RpcConfig::default());
        let supplied = CorrelationId::new().to_string();
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(REQUEST_ID_HEADER, supplied.as_str())
            .body(Body::from(
                json!({"jsonrpc": "2.0", "id": 1, "method": "getheight"}).to_string(),
            ))
            .unwrap();
        let response = svc.build_http_router().oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            supplied.as_str()
        );
    }

    #[tokio::test]
    async fn test_parse_error() {
        let svc = service(RpcConfig::default());
        let (status, _, body) =
            post_json(svc.build_http_router(), "/json_rpc", "{not json".into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], codes::PARSE_ERROR);
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn test_handler_error_envelope() {
        let svc = service(RpcConfig::default());
        let (_, _, body) = post_json(
            svc.build_http_router(),
            "/json_rpc",
            json!({"jsonrpc": "2.0", "id": "a", "method": "f_block_json", "params": {"hash": "0"}})
                .to_string(),
        )
        .await;
        assert_eq!(body["id"], "a");
        assert_eq!(body["error"]["code"], codes::TOO_SMALL_HEIGHT);
        assert!(body.get("result").is_none());
    }

    #[tokio::test]
    async fn test_unknown_method_and_null_id() {
        let svc = service(RpcConfig::default());
        let router = svc.build_http_router();
        let (_, _, body) = post_json(
            router.clone(),
            "/",
            json!({"jsonrpc": "2.0", "id": 1, "method": "eth_chainId"}).to_string(),
        )
        .await;
        assert_eq!(body["error"]["code"], codes::METHOD_NOT_FOUND);

        let (_, _, body) = post_json(
            router,
            "/",
            json!({"jsonrpc": "2.0", "id": null, "method": "getheight"}).to_string(),
        )
        .await;
        assert_eq!(body["error"]["code"], codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_batch() {
        let svc = service(RpcConfig::default());
        let batch = json!([
            {"jsonrpc": "2.0", "id": 1, "method": "getheight"},
            {"jsonrpc": "2.0", "id": 2, "method": "getdifficulty"},
            {"jsonrpc": "2.0", "id": 3, "method": "nope"}
        ]);
        let (_, _, body) = post_json(svc.build_http_router(), "/", batch.to_string()).await;
        let responses = body.as_array().unwrap();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["result"]["height"], 1);
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[2]["error"]["code"], codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_batch_limits() {
        let mut config = RpcConfig::default();
        config.limits.max_batch_size = 2;
        let svc = service(config);
        let request = json!({"jsonrpc": "2.0", "id": 1, "method": "getheight"});
        let batch = Value::Array(vec![request.clone(), request.clone(), request]);

        let (_, _, body) = post_json(svc.build_http_router(), "/", batch.to_string()).await;
        assert_eq!(body["error"]["code"], codes::LIMIT_EXCEEDED);
        assert_eq!(body["error"]["data"]["max"], 2);

        let (_, _, body) = post_json(svc.build_http_router(), "/", "[]".into()).await;
        assert_eq!(body["error"]["code"], codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let svc = service(RpcConfig::default());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = svc.build_http_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "daemon-rpc");
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let mut config = RpcConfig::default();
        config.http.port = 0;
        let mut svc = service(config);
        let addr = svc.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(matches!(svc.start().await, Err(GatewayError::Config(_))));
        svc.shutdown();
    }
}
