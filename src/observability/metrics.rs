//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_auth_decisions_total` (counter): auth outcomes by `outcome`, `reason`
//! - `gateway_requests_total` (counter): requests by `method`, `route`, `status`
//! - `gateway_request_duration_seconds` (histogram): latency by `route`
//!
//! # Design Decisions
//! - Recording is a no-op until the exporter is installed
//! - Labels stay low-cardinality: route names, never raw paths

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::security::access_control::DecisionEvent;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_decision(event: &DecisionEvent) {
    ::metrics::counter!(
        "gateway_auth_decisions_total",
        "outcome" => event.outcome.as_str(),
        "reason" => event.reason.as_str()
    )
    .increment(1);
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    ::metrics::histogram!(
        "gateway_request_duration_seconds",
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}
