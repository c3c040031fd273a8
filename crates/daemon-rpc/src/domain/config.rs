//! Daemon RPC configuration with validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main RPC configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Request validation limits
    pub limits: LimitsConfig,
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Sync protocol item caps
    pub sync: SyncConfig,
    /// Log output
    pub logging: LoggingConfig,
}

impl RpcConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        if self.limits.max_batch_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_batch_size cannot be 0".into(),
            ));
        }

        if self.timeouts.request.as_millis() == 0 {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }

        if self.sync.max_full_items == 0 || self.sync.max_hash_only_items == 0 {
            return Err(ConfigError::InvalidLimit(
                "sync item caps cannot be 0".into(),
            ));
        }

        if self.sync.fast_sync_max_count == 0 || self.sync.blocks_list_window == 0 {
            return Err(ConfigError::InvalidLimit(
                "block counts cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Defaults overlaid with environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CN_RPC_HOST`: Bind address (default: 127.0.0.1)
    /// - `CN_RPC_PORT`: Port (default: 8081)
    /// - `CN_RPC_MAX_BATCH`: Max batch size (default: 100)
    /// - `CN_RPC_TIMEOUT`: Request timeout, e.g. `30s` or `500ms`
    /// - `CN_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `CN_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(host) = env::var("CN_RPC_HOST") {
            config.http.host = host
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("CN_RPC_HOST: {}", host)))?;
        }
        if let Ok(port) = env::var("CN_RPC_PORT") {
            config.http.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("CN_RPC_PORT: {}", port)))?;
        }
        if let Ok(batch) = env::var("CN_RPC_MAX_BATCH") {
            config.limits.max_batch_size = batch
                .parse()
                .map_err(|_| ConfigError::InvalidLimit(format!("CN_RPC_MAX_BATCH: {}", batch)))?;
        }
        if let Ok(timeout) = env::var("CN_RPC_TIMEOUT") {
            config.timeouts.request = humantime_serde::parse_duration(&timeout)
                .map_err(|e| ConfigError::InvalidTimeout(format!("CN_RPC_TIMEOUT: {}", e)))?;
        }
        if let Ok(level) = env::var("CN_LOG_LEVEL").or_else(|_| env::var("RUST_LOG")) {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("CN_JSON_LOGS") {
            config.logging.json = json.to_lowercase() == "true" || json == "1";
        }

        config.validate()?;
        Ok(config)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8081)
    pub port: u16,
    /// Enable HTTP server
    pub enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8081,
            enabled: true,
        }
    }
}

/// Request limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max request body size in bytes (default: 10MB, block blobs are large)
    pub max_request_size: usize,
    /// Max batch size (number of requests in batch)
    pub max_batch_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 10 * 1024 * 1024,
            max_batch_size: 100,
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout applied by the transport
    #[serde(with = "humantime_serde")]
    pub request: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(30),
        }
    }
}

/// Item caps for the sync protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Hash-only entries returned before the timestamp offset
    pub max_hash_only_items: usize,
    /// Full entries returned from the timestamp offset on
    pub max_full_items: usize,
    /// Blocks returned by `getblocks`
    pub fast_sync_max_count: usize,
    /// Blocks listed by `f_blocks_list_json`
    pub blocks_list_window: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_hash_only_items: 10_000,
            max_full_items: 200,
            fast_sync_max_count: 1_000,
            blocks_list_window: 30,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error); `RUST_LOG` wins
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
