//! Request metrics and Prometheus exposition.
//!
//! # Metrics
//! - `demo_host_requests_total` (counter): dispatched requests by handler, action, status.
//!   Actions the handler did not recognize share the `_unknown` action label
//! - `demo_host_request_duration_seconds` (histogram): dispatch latency
//! - `demo_host_startup_total` (counter): completed host starts

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Action label for requests whose action was not recognized.
pub const UNKNOWN_ACTION: &str = "_unknown";

/// Record one dispatched request. Pass `None` as the action when the handler
/// did not recognize it.
pub fn record_request(handler: &str, action: Option<&str>, status: u16, start: Instant) {
    let action = action.map_or_else(|| UNKNOWN_ACTION.to_string(), str::to_ascii_lowercase);
    let labels = [
        ("handler", handler.to_ascii_lowercase()),
        ("action", action),
        ("status", status.to_string()),
    ];
    metrics::counter!("demo_host_requests_total", &labels).increment(1);
    metrics::histogram!("demo_host_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_startup(environment: &str) {
    metrics::counter!("demo_host_startup_total", "environment" => environment.to_string())
        .increment(1);
}
