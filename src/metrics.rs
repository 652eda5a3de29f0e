//! Prometheus metrics for store mutations and flow lookups.
//!
//! This module provides:
//! - Subscription mutation counters, labelled by operation
//! - Flow lookup outcome counters
//! - Flow lookup latency

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Subscription mutation counter metric name.
pub const METRIC_SUBSCRIPTION_MUTATIONS: &str = "subscription_mutations_total";
/// Flow lookup counter metric name.
pub const METRIC_FLOW_FETCHES: &str = "flow_fetch_total";
/// Flow lookup latency metric name.
pub const METRIC_FLOW_FETCH_LATENCY: &str = "flow_fetch_latency_ms";

/// Initialize all metric descriptions.
/// Call this once at startup, after a recorder is installed.
pub fn init_metrics() {
    describe_counter!(
        METRIC_SUBSCRIPTION_MUTATIONS,
        "Total number of subscription create/update/delete operations"
    );
    describe_counter!(
        METRIC_FLOW_FETCHES,
        "Total number of flow lookups by outcome"
    );
    describe_histogram!(
        METRIC_FLOW_FETCH_LATENCY,
        "Remote flow header fetch latency in milliseconds"
    );

    debug!("Metrics initialized");
}

/// Install the Prometheus recorder and describe metrics.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Increment the mutation counter for `op` (`create`, `update`, `delete`).
pub fn inc_subscription_mutation(op: &'static str) {
    counter!(METRIC_SUBSCRIPTION_MUTATIONS, "op" => op).increment(1);
}

/// Increment the flow lookup counter for `outcome`.
pub fn inc_flow_fetch(outcome: &'static str) {
    counter!(METRIC_FLOW_FETCHES, "outcome" => outcome).increment(1);
}

/// Record remote flow fetch latency.
pub fn record_flow_fetch_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_FLOW_FETCH_LATENCY).record(latency_ms);
}
