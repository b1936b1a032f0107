//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Record one event per auth decision
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level
//! - Credentials never appear in log fields

use axum::http::Method;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::security::access_control::{DecisionEvent, Outcome};

pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

pub fn log_decision(event: &DecisionEvent, method: &Method, path: &str, request_id: &str) {
    let route = event.route.as_deref().unwrap_or("-");
    let subject = event.subject.as_deref().unwrap_or("-");
    let outcome = event.outcome.as_str();
    let reason = event.reason.as_str();

    match event.outcome {
        Outcome::Forwarded => tracing::info!(
            request_id,
            %method,
            path,
            route,
            outcome,
            reason,
            subject,
            "Request authorized"
        ),
        Outcome::Rejected => tracing::warn!(
            request_id,
            %method,
            path,
            route,
            outcome,
            reason,
            "Request rejected"
        ),
        Outcome::NotFound => tracing::debug!(
            request_id,
            %method,
            path,
            outcome,
            reason,
            "No route for request"
        ),
    }
}
