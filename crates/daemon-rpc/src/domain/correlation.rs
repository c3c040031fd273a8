//! Request ids tying log lines of one HTTP call together.
//!
//! Ids are UUID v7, so they sort by arrival time. A caller may supply its
//! own id in the `x-request-id` header; anything that is not a UUID is
//! replaced with a fresh one.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Header carrying the id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Id of one HTTP call (a whole batch shares one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a new correlation ID (UUID v7)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse from string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    /// Reuse the caller's id when it parses, otherwise start a new one.
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|v| Self::parse(v.trim()).ok())
            .unwrap_or_default()
    }

    /// Milliseconds since the Unix epoch, for v7 ids.
    pub fn timestamp_ms(&self) -> Option<u64> {
        let bytes = self.0.as_bytes();
        if (bytes[6] >> 4) != 7 {
            return None;
        }
        Some(
            bytes[..6]
                .iter()
                .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)),
        )
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
