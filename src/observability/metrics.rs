//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (requests, latency, registry size, reloads)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `router_requests_total` (counter): requests by method, status, outcome
//! - `router_request_duration_seconds` (histogram): dispatch latency
//! - `router_routes_registered` (gauge): routes in the live registry
//! - `router_config_reloads_total` (counter): reloads by result
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Outcome label is derived from the status class, never from the path,
//!   to keep label cardinality bounded

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Outcome label for a response status.
pub fn outcome(status: u16) -> &'static str {
    match status {
        200..=299 => "ok",
        300..=399 => "redirect",
        404 => "not_found",
        405 => "method_not_allowed",
        400..=499 => "client_error",
        _ => "error",
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "router_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome(status)
    )
    .increment(1);
    histogram!("router_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_routes(count: usize) {
    gauge!("router_routes_registered").set(count as f64);
}

pub fn record_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("router_config_reloads_total", "result" => result).increment(1);
}
