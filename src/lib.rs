//! Edge gateway library: route table, token verification, auth filter and
//! error responses, hosted on Axum.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::{GatewayState, Shutdown};
