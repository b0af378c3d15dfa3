//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Quote requests and discarded late responses
//! - Approvals
//! - Executions by shape and outcome
//!
//! The host application serves the output of [`gather`].

use crate::error::{SwapError, SwapResult};

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    // Quote metrics
    pub static ref QUOTES: CounterVec = register_counter_vec!(
        "swap_orchestrator_quotes_total",
        "Quote fetches by outcome",
        &["outcome"]
    ).unwrap();

    // Approval metrics
    pub static ref APPROVALS: CounterVec = register_counter_vec!(
        "swap_orchestrator_approvals_total",
        "Allowance checks by outcome",
        &["outcome"]
    ).unwrap();

    // Execution metrics
    pub static ref EXECUTIONS: CounterVec = register_counter_vec!(
        "swap_orchestrator_executions_total",
        "Executions by swap shape and outcome",
        &["shape", "outcome"]
    ).unwrap();

    pub static ref EXECUTION_LATENCY: HistogramVec = register_histogram_vec!(
        "swap_orchestrator_execution_latency_seconds",
        "Time from signature request to mined receipt",
        &["shape"],
        vec![1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    ).unwrap();
}

/// Render all registered metrics in the text exposition format
pub fn gather() -> SwapResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| SwapError::Internal(format!("metrics encoding failed: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| SwapError::Internal(e.to_string()))
}

// Helper functions to record metrics

pub fn record_quote_requested() {
    QUOTES.with_label_values(&["requested"]).inc();
}

pub fn record_quote_discarded() {
    QUOTES.with_label_values(&["discarded"]).inc();
}

pub fn record_quote_failed() {
    QUOTES.with_label_values(&["failed"]).inc();
}

pub fn record_approval(outcome: &str) {
    APPROVALS.with_label_values(&[outcome]).inc();
}

pub fn record_execution(shape: &str, outcome: &str) {
    EXECUTIONS.with_label_values(&[shape, outcome]).inc();
}

pub fn record_execution_latency(shape: &str, latency_secs: f64) {
    EXECUTION_LATENCY
        .with_label_values(&[shape])
        .observe(latency_secs);
}
