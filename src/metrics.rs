//! Prometheus metrics for upstream call latency and outcomes.
//!
//! Every dispatched operation records:
//! - Upstream request latency, labelled by operation
//! - An outcome counter (`ok`, `provider_error`, `transport_error`)

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

use crate::error::UpstreamError;
use crate::stripe::Operation;

// === Metric Name Constants ===

/// Upstream request latency metric name.
pub const METRIC_UPSTREAM_LATENCY: &str = "upstream_request_latency_ms";
/// Upstream requests counter metric name.
pub const METRIC_UPSTREAM_REQUESTS: &str = "upstream_requests_total";

/// Install the Prometheus recorder and register metric descriptions.
/// Call this once at startup; the handle renders the /metrics body.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_histogram!(
        METRIC_UPSTREAM_LATENCY,
        "Upstream payment API request latency in milliseconds"
    );
    describe_counter!(
        METRIC_UPSTREAM_REQUESTS,
        "Total number of upstream payment API requests by outcome"
    );

    debug!("Metrics initialized");
    Ok(handle)
}

/// Outcome label for an upstream call result.
pub fn outcome_label<T>(result: &Result<T, UpstreamError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(UpstreamError::Provider { .. }) => "provider_error",
        Err(UpstreamError::Transport { .. }) => "transport_error",
    }
}

/// Record latency and outcome of one upstream call.
pub fn record_upstream<T>(operation: Operation, start: Instant, result: &Result<T, UpstreamError>) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_UPSTREAM_LATENCY, "operation" => operation.to_string()).record(latency_ms);
    counter!(
        METRIC_UPSTREAM_REQUESTS,
        "operation" => operation.to_string(),
        "outcome" => outcome_label(result)
    )
    .increment(1);
}
