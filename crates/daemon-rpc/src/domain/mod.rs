//! Domain types for the daemon RPC.
//!
//! Configuration, errors, the method registry and the wire bodies. Nothing
//! here talks to the engine; that goes through `crate::ports`.

pub mod config;
pub mod correlation;
pub mod error;
pub mod methods;
pub mod types;

// Re-exports for convenience
pub use config::{LimitsConfig, LoggingConfig, RpcConfig, SyncConfig};
pub use correlation::CorrelationId;
pub use error::{ApiError, ApiResult, ErrorKind, GatewayError, RpcError, RpcResult};
pub use methods::{get_method_info, is_method_supported, MethodCategory, MethodInfo};
pub use types::*;
