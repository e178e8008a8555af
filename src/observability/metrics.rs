//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status
//! - `proxy_request_duration_seconds` (histogram): time to response head
//! - `proxy_upstream_errors_total` (counter): failures by kind
//! - `proxy_stream_bytes_total` (counter): relayed body bytes
//! - `proxy_streams_total` (counter): finished streams by outcome
//! - `proxy_upstream_in_flight` (gauge): checked-out upstream exchanges
//! - `proxy_upstream_ready` (gauge): 1 once the upstream answered its health check
//! - `proxy_upstream_process_alive` (gauge): 1 while the supervised process runs
//!
//! All recorders are no-ops until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("proxy_requests_total", "method" => method.to_string(), "status" => status.clone())
        .increment(1);
    histogram!("proxy_request_duration_seconds", "method" => method.to_string(), "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(kind: &'static str) {
    counter!("proxy_upstream_errors_total", "kind" => kind).increment(1);
}

/// Record a finished response stream.
pub fn record_stream(outcome: &'static str, bytes: u64) {
    counter!("proxy_streams_total", "outcome" => outcome).increment(1);
    counter!("proxy_stream_bytes_total").increment(bytes);
}

pub fn set_in_flight(in_flight: usize) {
    gauge!("proxy_upstream_in_flight").set(in_flight as f64);
}

pub fn set_upstream_ready(ready: bool) {
    gauge!("proxy_upstream_ready").set(if ready { 1.0 } else { 0.0 });
}

pub fn set_process_alive(alive: bool) {
    gauge!("proxy_upstream_process_alive").set(if alive { 1.0 } else { 0.0 });
}
