//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate path patterns)
//!     → Return: RoutingDecision (target, rewritten path, auth policy) or None
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Compile patterns and rewrites, reject conflicts
//!     → Sort by specificity
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in the match path (segment comparison only)
//! - Deterministic: same input always matches same route
//! - Most specific pattern wins; ties keep declaration order

pub mod matcher;
pub mod router;

pub use matcher::{is_ambiguous_path, PathPattern, PatternError};
pub use router::{RewriteRule, Route, RouteTable, RoutingDecision};
