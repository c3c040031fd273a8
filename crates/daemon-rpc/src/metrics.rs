//! Request counters for the daemon RPC.
//!
//! Plain atomics; the `/health` endpoint reports them as JSON.

use crate::domain::error::ErrorKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Daemon RPC metrics
#[derive(Default)]
pub struct RpcMetrics {
    // Request counters
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,
    pub requests_error: AtomicU64,

    // Write request counters (submitblock, sendrawtransaction, ...)
    pub write_requests_total: AtomicU64,

    // Handler failures by kind
    pub invalid_parameter_errors: AtomicU64,
    pub internal_errors: AtomicU64,
    pub rejected_submissions: AtomicU64,

    // Batches
    pub batches_total: AtomicU64,
    pub batches_rejected: AtomicU64,

    // Latency tracking
    pub total_latency_ms: AtomicU64,
    pub request_count_for_latency: AtomicU64,
}

impl RpcMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request
    pub fn record_request(&self, success: bool, is_write: bool, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        if success {
            self.requests_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_error.fetch_add(1, Ordering::Relaxed);
        }

        if is_write {
            self.write_requests_total.fetch_add(1, Ordering::Relaxed);
        }

        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
        self.request_count_for_latency
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handler failure
    pub fn record_error_kind(&self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::InvalidParameter => &self.invalid_parameter_errors,
            ErrorKind::Internal => &self.internal_errors,
            ErrorKind::Rejected => &self.rejected_submissions,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch; `accepted` is false when it was over the size limit
    pub fn record_batch(&self, accepted: bool) {
        self.batches_total.fetch_add(1, Ordering::Relaxed);
        if !accepted {
            self.batches_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get average latency in ms
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.request_count_for_latency.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "success": self.requests_success.load(Ordering::Relaxed),
                "error": self.requests_error.load(Ordering::Relaxed),
                "writes": self.write_requests_total.load(Ordering::Relaxed),
            },
            "errors": {
                "invalid_parameter": self.invalid_parameter_errors.load(Ordering::Relaxed),
                "internal": self.internal_errors.load(Ordering::Relaxed),
                "rejected": self.rejected_submissions.load(Ordering::Relaxed),
            },
            "batches": {
                "total": self.batches_total.load(Ordering::Relaxed),
                "rejected": self.batches_rejected.load(Ordering::Relaxed),
            },
            "latency": {
                "average_ms": self.average_latency_ms(),
            }
        })
    }
}

/// Request timing helper
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<RpcMetrics>,
    is_write: bool,
}

impl RequestTimer {
    pub fn new(metrics: Arc<RpcMetrics>, is_write: bool) -> Self {
        Self {
            start: Instant::now(),
            metrics,
            is_write,
        }
    }

    pub fn finish(self, success: bool) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.metrics
            .record_request(success, self.is_write, latency_ms);
    }
}
