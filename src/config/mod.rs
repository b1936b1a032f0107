//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file + process environment
//!     → loader.rs (expand ${VAR:default} placeholders)
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → lifecycle::startup builds the shared gateway state once
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::GatewayConfig;
pub use schema::{
    AuthConfig, CorsConfig, KeyConfig, KeyFamily, ListenerConfig, LogFormat,
    ObservabilityConfig, RewriteConfig, RouteConfig, TimeoutConfig,
};
pub use validation::ValidationError;
