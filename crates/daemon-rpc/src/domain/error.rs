//! Daemon RPC error types with JSON-RPC 2.0 error codes.
//!
//! Handler failures use the CryptoNote daemon codes (`-1` .. `-10`);
//! framing failures use the standard JSON-RPC codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON-RPC error codes
pub mod codes {
    // JSON-RPC 2.0 standard errors (-32700 to -32600)
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // Server errors (-32000 to -32099)
    pub const LIMIT_EXCEEDED: i32 = -32005;

    // Daemon errors
    pub const WRONG_PARAM: i32 = -1;
    pub const TOO_BIG_HEIGHT: i32 = -2;
    pub const TOO_BIG_RESERVE_SIZE: i32 = -3;
    pub const WRONG_WALLET_ADDRESS: i32 = -4;
    pub const INTERNAL: i32 = -5;
    pub const WRONG_BLOCKBLOB: i32 = -6;
    pub const BLOCK_NOT_ACCEPTED: i32 = -7;
    pub const TOO_SMALL_HEIGHT: i32 = -10;
}

/// JSON-RPC error object
#[derive(Debug, Clone)]
pub struct ApiError {
    /// JSON-RPC error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Optional additional data
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create error with additional data
    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Parse error - invalid JSON
    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(
            codes::PARSE_ERROR,
            format!("Parse error: {}", details.into()),
        )
    }

    /// Invalid request - not a valid JSON-RPC request
    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_REQUEST,
            format!("Invalid request: {}", details.into()),
        )
    }

    /// Method not found
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    /// Invalid parameters
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_PARAMS,
            format!("Invalid params: {}", details.into()),
        )
    }

    /// Internal error outside any handler (worker panicked, etc.)
    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            codes::INTERNAL_ERROR,
            format!("Internal error: {}", details.into()),
        )
    }

    /// Limit exceeded; `data.max` carries the configured limit
    pub fn limit_exceeded(limit: impl Into<String>, max: usize) -> Self {
        Self::with_data(
            codes::LIMIT_EXCEEDED,
            format!("Limit exceeded: {}", limit.into()),
            serde_json::json!({ "max": max }),
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ApiError", 3)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(ref data) = self.data {
            state.serialize_field("data", data)?;
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for ApiError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ErrorHelper {
            code: i32,
            message: String,
            data: Option<serde_json::Value>,
        }

        let helper = ErrorHelper::deserialize(deserializer)?;
        Ok(ApiError {
            code: helper.code,
            message: helper.message,
            data: helper.data,
        })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_syntax() || e.is_eof() {
            ApiError::parse_error(e.to_string())
        } else {
            ApiError::invalid_params(e.to_string())
        }
    }
}

impl From<hex::FromHexError> for ApiError {
    fn from(e: hex::FromHexError) -> Self {
        ApiError::invalid_params(format!("invalid hex: {}", e))
    }
}

impl From<RpcError> for ApiError {
    fn from(e: RpcError) -> Self {
        ApiError::new(e.code(), e.to_string())
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Broad classification of handler failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something unusable, or asked for something missing.
    InvalidParameter,
    /// The node failed to produce an answer it should have been able to.
    Internal,
    /// The engine refused a submission.
    Rejected,
}

/// Handler-level failure, carried to the client as a JSON-RPC error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    #[error("{0}")]
    WrongParam(String),

    #[error("{0}")]
    TooBigHeight(String),

    #[error("{0}")]
    TooBigReserveSize(String),

    #[error("{0}")]
    WrongWalletAddress(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    WrongBlockBlob(String),

    #[error("{0}")]
    BlockNotAccepted(String),

    #[error("{0}")]
    TooSmallHeight(String),
}

impl RpcError {
    /// Wire code
    pub fn code(&self) -> i32 {
        match self {
            RpcError::WrongParam(_) => codes::WRONG_PARAM,
            RpcError::TooBigHeight(_) => codes::TOO_BIG_HEIGHT,
            RpcError::TooBigReserveSize(_) => codes::TOO_BIG_RESERVE_SIZE,
            RpcError::WrongWalletAddress(_) => codes::WRONG_WALLET_ADDRESS,
            RpcError::Internal(_) => codes::INTERNAL,
            RpcError::WrongBlockBlob(_) => codes::WRONG_BLOCKBLOB,
            RpcError::BlockNotAccepted(_) => codes::BLOCK_NOT_ACCEPTED,
            RpcError::TooSmallHeight(_) => codes::TOO_SMALL_HEIGHT,
        }
    }

    /// Classification used for logging and metrics.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Internal(_) => ErrorKind::Internal,
            RpcError::BlockNotAccepted(_) => ErrorKind::Rejected,
            RpcError::WrongParam(_)
            | RpcError::TooBigHeight(_)
            | RpcError::TooBigReserveSize(_)
            | RpcError::WrongWalletAddress(_)
            | RpcError::WrongBlockBlob(_)
            | RpcError::TooSmallHeight(_) => ErrorKind::InvalidParameter,
        }
    }
}

/// Handler result type
pub type RpcResult<T> = Result<T, RpcError>;

/// Service-level errors (not JSON-RPC, internal use)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Logging could not be initialised
    #[error("telemetry error: {0}")]
    Telemetry(String),
}
