//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the route's target
//! - Drop connection-scoped headers in both directions
//! - Add `x-forwarded-for` / `x-forwarded-host`
//!
//! # Design Decisions
//! - `Forwarder` is a seam: the gateway core only decides *whether* and
//!   *where* to forward, the forwarder decides *how*
//! - One attempt per request; failures surface as `ForwardError`
//! - A forwarder declares the target schemes it can reach, so routes it
//!   cannot serve are reported at startup

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Request, Uri, Version},
    response::Response,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::routing::{Route, RouteTable, RoutingDecision};
use crate::security::headers::strip_hop_by_hop;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid upstream uri: {0}")]
    InvalidUri(String),

    #[error("target scheme `{0}` is not supported by this forwarder")]
    UnsupportedScheme(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Sends an authorized request to its backend.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(
        &self,
        decision: &RoutingDecision,
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response, ForwardError>;

    fn supports_scheme(&self, _scheme: &str) -> bool {
        true
    }
}

/// Routes whose target scheme `forwarder` cannot reach, one entry per route name.
pub fn unsupported_routes<'a>(routes: &'a RouteTable, forwarder: &dyn Forwarder) -> Vec<&'a Route> {
    let mut unsupported: Vec<&Route> = Vec::new();
    for route in routes.routes() {
        if forwarder.supports_scheme(route.target.scheme()) {
            continue;
        }
        if !unsupported.iter().any(|r| r.name == route.name) {
            unsupported.push(route);
        }
    }
    unsupported
}

/// Plain HTTP/1.1 forwarder over a pooled hyper client.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
}

impl HttpForwarder {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(
        &self,
        decision: &RoutingDecision,
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response, ForwardError> {
        let scheme = decision.target.scheme();
        if !self.supports_scheme(scheme) {
            return Err(ForwardError::UnsupportedScheme(scheme.to_string()));
        }

        let (mut parts, body) = request.into_parts();

        parts.uri = upstream_uri(decision, parts.uri.query())?;
        parts.version = Version::HTTP_11;

        let original_host = parts.headers.remove(header::HOST);
        strip_hop_by_hop(&mut parts.headers);

        if let Some(addr) = client_addr {
            let forwarded_for = match parts
                .headers
                .get(X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
            {
                Some(prev) => format!("{prev}, {}", addr.ip()),
                None => addr.ip().to_string(),
            };
            if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
                parts.headers.insert(X_FORWARDED_FOR, value);
            }
        }
        if let Some(host) = original_host {
            parts.headers.insert(X_FORWARDED_HOST, host);
        }

        let response = self.client.request(Request::from_parts(parts, body)).await?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }

    fn supports_scheme(&self, scheme: &str) -> bool {
        scheme == "http"
    }
}

/// Target base path + decided path + original query.
pub fn upstream_uri(decision: &RoutingDecision, query: Option<&str>) -> Result<Uri, ForwardError> {
    let target = &decision.target;
    let host = target
        .host_str()
        .ok_or_else(|| ForwardError::InvalidUri(target.to_string()))?;
    let authority = match target.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut uri = format!(
        "{}://{}{}",
        target.scheme(),
        authority,
        target.path().trim_end_matches('/')
    );
    if !decision.path.starts_with('/') {
        uri.push('/');
    }
    uri.push_str(&decision.path);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        uri.push('?');
        uri.push_str(query);
    }

    uri.parse::<Uri>()
        .map_err(|e| ForwardError::InvalidUri(format!("{uri}: {e}")))
}
