//! # Integration Flows
//!
//! Every test talks JSON-RPC to a [`TestNode`]: the real router and
//! middleware stack over the in-memory engine, session and miner.

mod mining_flows;
mod sync_flows;
mod wallet_flows;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::Router;
use daemon_rpc::testing::{InMemoryEngine, MockMiner, MockSession, TestAccount};
use daemon_rpc::{DaemonRpcService, RpcConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Genesis timestamp of every test chain.
pub const GENESIS_TIMESTAMP: u64 = 1_500_000_000;

/// A node with its RPC router and the doubles behind it.
pub struct TestNode {
    pub engine: Arc<InMemoryEngine>,
    pub session: Arc<MockSession>,
    pub miner: Arc<MockMiner>,
    pub service: DaemonRpcService,
    pub router: Router,
    /// Owner of the genesis coinbase
    pub genesis_miner: TestAccount,
    pub rng: StdRng,
}

impl TestNode {
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, RpcConfig::default())
    }

    pub fn with_config(seed: u64, config: RpcConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let genesis_miner = TestAccount::generate(&mut rng);
        let engine = Arc::new(
            InMemoryEngine::new(&genesis_miner.address(), GENESIS_TIMESTAMP, seed)
                .expect("genesis"),
        );
        let session = Arc::new(MockSession::new());
        let miner = Arc::new(MockMiner::new());
        let service =
            DaemonRpcService::new(config, engine.clone(), session.clone(), miner.clone())
                .expect("service");
        let router = service.build_http_router();

        Self {
            engine,
            session,
            miner,
            service,
            router,
            genesis_miner,
            rng,
        }
    }

    /// POST one JSON body and return the decoded response body.
    pub async fn post(&self, body: Value) -> Value {
        let request = Request::builder()
            .method("POST")
            .uri("/json_rpc")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let response = self.router.clone().oneshot(request).await.expect("response");
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    /// Call `method` and return the whole response envelope.
    pub async fn call(&self, method: &str, params: Value) -> Value {
        self.post(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        }))
        .await
    }

    /// Call `method` and return its result, failing on an error object.
    pub async fn result(&self, method: &str, params: Value) -> Value {
        let envelope = self.call(method, params).await;
        assert!(
            envelope.get("error").is_none(),
            "{} failed: {}",
            method,
            envelope["error"]
        );
        envelope["result"].clone()
    }

    /// Call `method` and return the code of the error it must produce.
    pub async fn error_code(&self, method: &str, params: Value) -> i64 {
        let envelope = self.call(method, params).await;
        envelope["error"]["code"]
            .as_i64()
            .unwrap_or_else(|| panic!("{} did not fail: {}", method, envelope))
    }

    /// Fetch a template for `account`, submit it unchanged, return its blob.
    pub async fn mine_via_template(&self, account: &TestAccount) -> String {
        let template = self
            .result(
                "getblocktemplate",
                json!({"reserve_size": 0, "wallet_address": account.address_string()}),
            )
            .await;
        let blob = template["blocktemplate_blob"]
            .as_str()
            .expect("template blob")
            .to_string();
        let submitted = self.result("submitblock", json!([blob.clone()])).await;
        assert_eq!(submitted["status"], "OK");
        blob
    }
}
