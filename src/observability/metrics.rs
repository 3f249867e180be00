//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_proxy_requests_total` (counter): requests by method, handler, status
//! - `edge_proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `edge_proxy_upstream_attempts_total` (counter): attempts by upstream, outcome
//! - `edge_proxy_upstream_attempt_duration_seconds` (histogram): per attempt
//! - `edge_proxy_side_channel_total` (counter): email sends by outcome
//! - `edge_proxy_offline_fallbacks_total` (counter): synthesized answers by endpoint
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, handler: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("handler", handler.to_string()),
        ("status", status.to_string()),
    ];
    counter!("edge_proxy_requests_total", &labels).increment(1);
    histogram!("edge_proxy_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_attempt(upstream: &str, outcome: &'static str, start: Instant) {
    let labels = [("upstream", upstream.to_string()), ("outcome", outcome.to_string())];
    counter!("edge_proxy_upstream_attempts_total", &labels).increment(1);
    histogram!("edge_proxy_upstream_attempt_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_side_channel(provider: &str, outcome: &'static str) {
    counter!(
        "edge_proxy_side_channel_total",
        "provider" => provider.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_offline_fallback(endpoint: &str) {
    counter!("edge_proxy_offline_fallbacks_total", "endpoint" => endpoint.to_string()).increment(1);
}
