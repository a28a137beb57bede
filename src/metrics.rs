//! Prometheus metrics for application observability.
//!
//! Metrics are exposed via a dedicated HTTP listener when `METRICS_PORT` is
//! non-zero. Recording functions are safe to call when no exporter is
//! installed; they become no-ops.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `gobo_auth_failures_total` - Rejected Basic auth attempts (label: reason)
//! - `gobo_rate_limited_total` - Requests rejected by the fixed-window limiter
//! - `gobo_examples_created_total` - Examples persisted
//! - `gobo_storage_errors_total` - Repository/cache failures (label: operation)
//!
//! ## Histograms
//! - `gobo_request_duration_seconds` - Handler duration (labels: endpoint, method, status)

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

use crate::error::{AuthFailure, StorageOperation};

/// Metric names as constants for consistency.
pub mod names {
    pub const AUTH_FAILURES_TOTAL: &str = "gobo_auth_failures_total";
    pub const RATE_LIMITED_TOTAL: &str = "gobo_rate_limited_total";
    pub const EXAMPLES_CREATED_TOTAL: &str = "gobo_examples_created_total";
    pub const STORAGE_ERRORS_TOTAL: &str = "gobo_storage_errors_total";
    pub const REQUEST_DURATION_SECONDS: &str = "gobo_request_duration_seconds";
}

/// Initialize the Prometheus metrics exporter.
///
/// # Errors
///
/// Returns a message if the exporter cannot be installed (port in use,
/// recorder already set).
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::AUTH_FAILURES_TOTAL,
        "Total number of rejected Basic authentication attempts"
    );
    describe_counter!(
        names::RATE_LIMITED_TOTAL,
        "Total number of requests rejected by the rate limiter"
    );
    describe_counter!(
        names::EXAMPLES_CREATED_TOTAL,
        "Total number of examples created"
    );
    describe_counter!(
        names::STORAGE_ERRORS_TOTAL,
        "Total number of failed repository or cache calls"
    );
    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "Handler duration in seconds"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

pub fn record_auth_failure(reason: AuthFailure) {
    counter!(names::AUTH_FAILURES_TOTAL, "reason" => reason.as_str()).increment(1);
}

pub fn record_rate_limited() {
    counter!(names::RATE_LIMITED_TOTAL).increment(1);
}

pub fn record_example_created() {
    counter!(names::EXAMPLES_CREATED_TOTAL).increment(1);
}

pub fn record_storage_error(operation: StorageOperation) {
    counter!(names::STORAGE_ERRORS_TOTAL, "operation" => operation.as_str()).increment(1);
}

/// Record handler duration.
pub fn record_request_duration(endpoint: &str, method: &str, status: u16, duration_secs: f64) {
    histogram!(
        names::REQUEST_DURATION_SECONDS,
        "endpoint" => endpoint.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(duration_secs);
}
