//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     keys.rs (load the verification key once)
//!
//! Incoming request:
//!     → access_control.rs (fixed auth pipeline)
//!         → headers.rs (strip client identity headers)
//!         → token.rs (verify bearer credential)
//!         → headers.rs (inject verified identity)
//!     → Forward or reject
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any verification failure
//! - No trust in client-supplied identity

pub mod access_control;
pub mod headers;
pub mod keys;
pub mod token;

pub use access_control::{auth_middleware, AuthDecision, AuthFilter, Evaluation, PublicPaths};
pub use keys::VerificationKey;
pub use token::{Claims, CredentialVerifier, TokenError, TokenVerifier};
