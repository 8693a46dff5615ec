//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): client requests by status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_upstream_attempts_total` (counter): attempts by endpoint host, outcome
//! - `proxy_upstream_attempt_duration_seconds` (histogram): per-attempt latency
//! - `proxy_endpoint_healthy` (gauge): 1=healthy, 0=recently failed
//! - `proxy_query_rejections_total` (counter): validator rejections by rule
//! - `proxy_rate_limited_total` (counter): requests refused by the rate limiter
//!
//! Recording is a no-op until `init_metrics` installs the Prometheus recorder.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    counter!("proxy_requests_total", "status" => status.to_string()).increment(1);
    histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_attempt(endpoint: &str, outcome: &'static str, start: Instant) {
    counter!(
        "proxy_upstream_attempts_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("proxy_upstream_attempt_duration_seconds", "endpoint" => endpoint.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_endpoint_health(endpoint: &str, healthy: bool) {
    gauge!("proxy_endpoint_healthy", "endpoint" => endpoint.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_rejection(reason: &'static str) {
    counter!("proxy_query_rejections_total", "reason" => reason).increment(1);
}

pub fn record_rate_limited() {
    counter!("proxy_rate_limited_total").increment(1);
}
