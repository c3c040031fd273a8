// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! Daemon RPC - JSON-RPC facade of a CryptoNote full node.
//!
//! Wallets, miners, pools and explorers talk to the node through this crate.
//! It decodes requests, calls the blockchain engine, P2P session and miner
//! through ports, and shapes the answers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            DAEMON RPC                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  HTTP POST /json_rpc (and /)            GET /health                     │
//! │         │                                                               │
//! │  ┌──────┴──────────────────────────────────────────┐                    │
//! │  │  Trace → BodyLimit → Timeout   (tower-http)     │                    │
//! │  └──────┬──────────────────────────────────────────┘                    │
//! │         │  id checks, batches, x-request-id                             │
//! │  ┌──────┴──────────────────────────────────────────┐                    │
//! │  │  router::route_method  (blocking pool)          │                    │
//! │  └──────┬──────────────────────────────────────────┘                    │
//! │         │                                                               │
//! │  ┌──────┴─────┬──────────┬─────────┬────────┬────────────┬──────────┐   │
//! │  │ Payments   │ Mining   │ Chain   │ Sync   │ Submission │ Node     │   │
//! │  │ (stealth)  │(template)│(project)│        │            │          │   │
//! │  └──────┬─────┴────┬─────┴────┬────┴───┬────┴─────┬──────┴────┬─────┘   │
//! └─────────┼──────────┼──────────┼────────┼──────────┼───────────┼─────────┘
//!           ▼          ▼          ▼        ▼          ▼           ▼
//!     BlockchainEngine            NodeSession          MinerControl
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use daemon_rpc::{DaemonRpcService, RpcConfig};
//!
//! let config = RpcConfig::from_env()?;
//! daemon_rpc::telemetry::init_tracing(&config.logging)?;
//! let mut service = DaemonRpcService::new(config, engine, session, miner)?;
//! let addr = service.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod metrics;
pub mod ports;
pub mod router;
pub mod rpc;
pub mod service;
pub mod telemetry;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports for public API
pub use domain::config::{RpcConfig, SyncConfig};
pub use domain::error::{ApiError, ApiResult, GatewayError, RpcError, RpcResult};
pub use domain::methods::{get_method_info, is_method_supported, MethodCategory, MethodInfo};
pub use domain::types::*;
pub use metrics::RpcMetrics;
pub use ports::{BlockchainEngine, EngineError, MinerControl, NodeSession};
pub use rpc::DaemonRpcHandlers;
pub use service::DaemonRpcService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
