//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Auth middleware and proxy handler produce:
//!     → logging.rs (one structured event per auth decision)
//!     → metrics.rs (decision and request counters, latency histogram)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log event
//! - The auth filter itself never logs; it returns events

pub mod logging;
pub mod metrics;
