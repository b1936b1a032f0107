//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → request.rs (request ID)
//!     → security::access_control (auth decision)
//!     → forward.rs (send to backend)   | response.rs (gateway-generated error)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{unsupported_routes, ForwardError, Forwarder, HttpForwarder};
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use response::{ErrorCode, ErrorResponse, UpstreamUnavailable};
pub use server::{AppState, HttpServer};
