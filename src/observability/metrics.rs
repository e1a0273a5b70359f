//! Metrics collection and exposition.
//!
//! # Metrics
//! - `scriptserve_requests_total` (counter): requests by method, status
//! - `scriptserve_request_duration_seconds` (histogram): dispatch latency
//! - `scriptserve_rate_limit_decisions_total` (counter): by limiter, outcome
//! - `scriptserve_ws_clients` (gauge): registered WebSocket clients
//! - `scriptserve_sessions` (gauge): live sessions

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a dispatched HTTP request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "scriptserve_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("scriptserve_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a rate limiter admission decision.
pub fn record_rate_limit(limiter: &str, allowed: bool) {
    let outcome = if allowed { "allowed" } else { "rejected" };
    counter!(
        "scriptserve_rate_limit_decisions_total",
        "limiter" => limiter.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record the current WebSocket registry size.
pub fn record_ws_clients(count: usize) {
    gauge!("scriptserve_ws_clients").set(count as f64);
}

/// Record the current number of stored sessions.
pub fn record_sessions(count: usize) {
    gauge!("scriptserve_sessions").set(count as f64);
}
