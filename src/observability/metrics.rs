//! Metrics collection and exposition.
//!
//! # Metrics
//! - `agridatum_submissions_total` (counter): submissions by outcome
//! - `agridatum_anchor_total` (counter): anchoring attempts by outcome
//! - `agridatum_chain_request_duration_seconds` (histogram): indexer latency by operation
//! - `agridatum_verifications_total` (counter): verification requests by outcome
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library users
//!   and tests pay nothing
//! - Labels stay low-cardinality: outcome and operation names only

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Metric names used throughout the service.
pub mod names {
    /// Harvest submissions, labeled by `outcome`.
    pub const SUBMISSIONS_TOTAL: &str = "agridatum_submissions_total";
    /// Anchoring attempts, labeled by `outcome`.
    pub const ANCHOR_TOTAL: &str = "agridatum_anchor_total";
    /// Indexer request latency, labeled by `operation`.
    pub const CHAIN_REQUEST_DURATION_SECONDS: &str = "agridatum_chain_request_duration_seconds";
    /// Verification requests, labeled by `outcome`.
    pub const VERIFICATIONS_TOTAL: &str = "agridatum_verifications_total";
}

/// Install the Prometheus recorder with its own HTTP listener.
///
/// Failure is logged; the service keeps running without metrics.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_submission(outcome: &'static str) {
    metrics::counter!(names::SUBMISSIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_anchor(outcome: &'static str) {
    metrics::counter!(names::ANCHOR_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_chain_request(operation: &'static str, elapsed: Duration) {
    metrics::histogram!(names::CHAIN_REQUEST_DURATION_SECONDS, "operation" => operation)
        .record(elapsed.as_secs_f64());
}

pub fn record_verification(outcome: &'static str) {
    metrics::counter!(names::VERIFICATIONS_TOTAL, "outcome" => outcome).increment(1);
}
