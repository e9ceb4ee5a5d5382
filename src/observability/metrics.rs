//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by pipeline, status
//! - `proxy_request_duration_seconds` (histogram): latency by pipeline
//! - `proxy_image_resolutions_total` (counter): inline image probes by outcome
//!
//! # Design Decisions
//! - Recording is unconditional; without an installed recorder it is a no-op
//! - Labels stay low-cardinality (no URLs, no hosts)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

/// Record one finished inbound request.
pub fn record_request(pipeline: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "pipeline" => pipeline.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "pipeline" => pipeline.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of probing an inline image for its dimensions.
pub fn record_image_resolution(outcome: &'static str) {
    metrics::counter!("proxy_image_resolutions_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("html", 200, Instant::now());
        record_image_resolution("ok");
    }
}
