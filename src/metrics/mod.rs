//! Prometheus metrics for monitoring
//!
//! Exposes counters for:
//! - Transaction submissions and rejections
//! - Gateway requests per function
//! - Transport retries
//! - Settled outcomes by status

use crate::gateway::NagFunction;
use crate::tx::TxStatus;

use lazy_static::lazy_static;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec, Encoder, TextEncoder};

lazy_static! {
    // Transaction metrics
    pub static ref TX_SUBMITTED: Counter = register_counter!(
        "certnotary_transactions_submitted_total",
        "Total transactions accepted by the gateway"
    ).unwrap();

    pub static ref TX_REJECTED: Counter = register_counter!(
        "certnotary_transactions_rejected_total",
        "Total transactions answered with a non-200 result"
    ).unwrap();

    // Gateway metrics
    pub static ref GATEWAY_REQUESTS: CounterVec = register_counter_vec!(
        "certnotary_gateway_requests_total",
        "Total gateway requests by function",
        &["function"]
    ).unwrap();

    pub static ref TRANSPORT_RETRIES: Counter = register_counter!(
        "certnotary_transport_retries_total",
        "Total HTTP attempts repeated after a retryable failure"
    ).unwrap();

    // Outcome metrics
    pub static ref OUTCOMES: CounterVec = register_counter_vec!(
        "certnotary_outcomes_total",
        "Total polled transaction outcomes by final status",
        &["status"]
    ).unwrap();
}

/// Render every registered metric in the Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

// Helper functions to record metrics

pub fn record_tx_submitted() {
    TX_SUBMITTED.inc();
}

pub fn record_tx_rejected() {
    TX_REJECTED.inc();
}

pub fn record_gateway_request(function: NagFunction) {
    GATEWAY_REQUESTS
        .with_label_values(&[function.label()])
        .inc();
}

pub fn record_transport_retry() {
    TRANSPORT_RETRIES.inc();
}

pub fn record_outcome(status: &TxStatus) {
    OUTCOMES.with_label_values(&[status.label()]).inc();
}

pub fn record_outcome_timeout() {
    OUTCOMES.with_label_values(&["timeout"]).inc();
}
