//! Auth filter.
//!
//! # Responsibilities
//! - Decide, per request, whether it is forwarded or rejected
//! - Bypass verification for public paths and unauthenticated routes
//! - Extract and verify the bearer credential
//! - Inject the verified identity for downstream services
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → strip client-supplied identity headers
//!     → reject ambiguous paths (dot segments, encoded separators)
//!     → route resolution (NotFound when unmatched)
//!     → public-path / requires_auth check
//!     → Authorization: Bearer extraction
//!     → token verification
//!     → identity header injection
//!     → Forward | Reject
//! ```
//!
//! # Design Decisions
//! - `AuthFilter` is synchronous and does no logging; it returns a decision
//!   event and `auth_middleware` hands that to observability
//! - The stage order is fixed; there is no runtime filter registration
//! - Never forward an unverified request to a protected route

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use crate::http::request::RequestIdExt;
use crate::http::response::{ErrorCode, ErrorResponse};
use crate::lifecycle::startup::GatewayState;
use crate::observability::{logging, metrics};
use crate::routing::{is_ambiguous_path, PathPattern, PatternError, RouteTable, RoutingDecision};
use crate::security::headers::{strip_identity_headers, IdentityContext};
use crate::security::token::{CredentialVerifier, TokenError};

const BEARER_PREFIX: &str = "Bearer ";

/// Paths that never require a credential, whatever route serves them.
#[derive(Debug, Clone, Default)]
pub struct PublicPaths {
    patterns: Vec<PathPattern>,
}

impl PublicPaths {
    pub fn new(patterns: &[String]) -> Result<Self, PatternError> {
        let patterns = patterns
            .iter()
            .map(|p| PathPattern::parse(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

/// Terminal state of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Forwarded,
    Rejected,
    NotFound,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Forwarded => "forwarded",
            Outcome::Rejected => "rejected",
            Outcome::NotFound => "not_found",
        }
    }
}

/// Why the filter reached its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    PublicPath,
    AuthNotRequired,
    Verified,
    NoRoute,
    AmbiguousPath,
    MissingHeader,
    MalformedHeader,
    VerificationFailed(TokenError),
    ClaimsUnreadable,
    InternalFault,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::PublicPath => "public_path",
            Reason::AuthNotRequired => "auth_not_required",
            Reason::Verified => "verified",
            Reason::NoRoute => "no_route",
            Reason::AmbiguousPath => "ambiguous_path",
            Reason::MissingHeader => "missing_header",
            Reason::MalformedHeader => "malformed_header",
            Reason::VerificationFailed(e) => e.as_str(),
            Reason::ClaimsUnreadable => "claims_unreadable",
            Reason::InternalFault => "internal_fault",
        }
    }
}

/// One observable event per request. Never carries the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionEvent {
    pub outcome: Outcome,
    pub reason: Reason,
    pub route: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Forward(RoutingDecision),
    Reject(ErrorCode),
    /// No route; the host decides what to answer.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: AuthDecision,
    pub event: DecisionEvent,
}

impl Evaluation {
    fn forward(decision: RoutingDecision, reason: Reason, subject: Option<String>) -> Self {
        let route = Some(decision.route.clone());
        Self {
            decision: AuthDecision::Forward(decision),
            event: DecisionEvent {
                outcome: Outcome::Forwarded,
                reason,
                route,
                subject,
            },
        }
    }

    fn reject(code: ErrorCode, reason: Reason, route: Option<String>) -> Self {
        Self {
            decision: AuthDecision::Reject(code),
            event: DecisionEvent {
                outcome: Outcome::Rejected,
                reason,
                route,
                subject: None,
            },
        }
    }

    fn not_found() -> Self {
        Self {
            decision: AuthDecision::NotFound,
            event: DecisionEvent {
                outcome: Outcome::NotFound,
                reason: Reason::NoRoute,
                route: None,
                subject: None,
            },
        }
    }

    /// A fault escaped the pipeline.
    pub fn internal_fault() -> Self {
        Self::reject(ErrorCode::AuthServiceError, Reason::InternalFault, None)
    }
}

/// Fixed-order authentication pipeline over an immutable route table.
#[derive(Clone)]
pub struct AuthFilter {
    routes: Arc<RouteTable>,
    public_paths: PublicPaths,
    verifier: Arc<dyn CredentialVerifier>,
}

impl AuthFilter {
    pub fn new(
        routes: Arc<RouteTable>,
        public_paths: PublicPaths,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            routes,
            public_paths,
            verifier,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn public_paths(&self) -> &PublicPaths {
        &self.public_paths
    }

    /// Evaluate a request head, its path and headers, against the wall clock.
    pub fn evaluate(&self, path: &str, headers: &mut HeaderMap) -> Evaluation {
        self.evaluate_at(path, headers, Utc::now())
    }

    /// Run the pipeline for `path`, mutating `headers` in place.
    ///
    /// Identity headers are stripped first on every path. On a verified
    /// forward they are re-added from the token's claims.
    pub fn evaluate_at(
        &self,
        path: &str,
        headers: &mut HeaderMap,
        now: DateTime<Utc>,
    ) -> Evaluation {
        strip_identity_headers(headers);

        // matching and forwarding must see the same segments as the backend
        if is_ambiguous_path(path) {
            return Evaluation::reject(ErrorCode::InvalidRequestPath, Reason::AmbiguousPath, None);
        }

        let Some(decision) = self.routes.resolve(path) else {
            return Evaluation::not_found();
        };

        if self.public_paths.is_public(path) {
            return Evaluation::forward(decision, Reason::PublicPath, None);
        }
        if !decision.requires_auth {
            return Evaluation::forward(decision, Reason::AuthNotRequired, None);
        }

        let route = Some(decision.route.clone());

        let token = match bearer_token(headers) {
            Ok(token) => token,
            Err((code, reason)) => return Evaluation::reject(code, reason, route),
        };

        let claims = match self.verifier.verify_at(token, now) {
            Ok(claims) => claims,
            Err(e) => {
                return Evaluation::reject(ErrorCode::InvalidToken, Reason::VerificationFailed(e), route)
            }
        };

        let identity = match IdentityContext::from_claims(&claims) {
            Ok(identity) => identity,
            Err(_) => {
                return Evaluation::reject(
                    ErrorCode::TokenProcessingError,
                    Reason::ClaimsUnreadable,
                    route,
                )
            }
        };

        if identity.apply(headers, now).is_err() {
            return Evaluation::reject(
                ErrorCode::TokenProcessingError,
                Reason::ClaimsUnreadable,
                route,
            );
        }

        Evaluation::forward(decision, Reason::Verified, Some(identity.subject))
    }
}

/// Token from `Authorization: Bearer <token>`, trimmed.
fn bearer_token(headers: &HeaderMap) -> Result<&str, (ErrorCode, Reason)> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or((ErrorCode::MissingAuthHeader, Reason::MissingHeader))?;

    let malformed = (ErrorCode::InvalidAuthHeader, Reason::MalformedHeader);
    let raw = value.to_str().map_err(|_| malformed)?;
    let token = raw.strip_prefix(BEARER_PREFIX).ok_or(malformed)?.trim();
    if token.is_empty() {
        return Err(malformed);
    }
    Ok(token)
}

/// Axum adapter around [`AuthFilter`].
///
/// Forwarded requests carry their [`RoutingDecision`] as an extension for the
/// proxy handler. Unmatched requests pass through untouched so gateway-local
/// handlers (and the 404 fallback) can answer them.
pub async fn auth_middleware(
    State(state): State<Arc<GatewayState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let request_id = req.request_id().unwrap_or("unknown").to_string();

    let filter = state.filter();
    let evaluation = panic::catch_unwind(AssertUnwindSafe(|| {
        filter.evaluate(&path, req.headers_mut())
    }))
    .unwrap_or_else(|_| Evaluation::internal_fault());

    logging::log_decision(&evaluation.event, &method, &path, &request_id);
    metrics::record_decision(&evaluation.event);

    match evaluation.decision {
        AuthDecision::Forward(decision) => {
            req.extensions_mut().insert(decision);
            next.run(req).await
        }
        AuthDecision::NotFound => next.run(req).await,
        AuthDecision::Reject(code) => ErrorResponse::new(code, &path).into_response(),
    }
}
