//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use edge_gateway::config::{
    GatewayConfig, KeyConfig, KeyFamily, RewriteConfig, RouteConfig,
};
use edge_gateway::http::{ForwardError, Forwarder};
use edge_gateway::routing::RoutingDecision;
use edge_gateway::security::{Claims, CredentialVerifier, TokenError};

pub const GATEWAY_PRIVATE: &str = include_str!("../keys/gateway_private.pem");
pub const GATEWAY_PUBLIC: &str = include_str!("../keys/gateway_public.pem");
pub const OTHER_PRIVATE: &str = include_str!("../keys/other_private.pem");

/// Start a backend that answers every request with its own request head.
///
/// Binds an ephemeral port and returns the bound address.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            buf.extend_from_slice(&chunk[..n]);
                            if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }

                let head = String::from_utf8_lossy(&buf).into_owned();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    head.len(),
                    head
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn mint_token(private_pem: &str, claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap();
    encode(&Header::new(Algorithm::RS256), claims, &key).unwrap()
}

pub fn access_claims(sub: &str, role: Option<&str>) -> Value {
    let mut claims = json!({
        "sub": sub,
        "tokenType": "ACCESS",
        "iat": Utc::now().timestamp(),
        "exp": Utc::now().timestamp() + 900,
    });
    if let Some(role) = role {
        claims["role"] = json!(role);
    }
    claims
}

/// Gateway config mirroring the production route set, targeting `backend`.
pub fn gateway_config(backend: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.observability.metrics_enabled = false;
    config.auth.key = KeyConfig {
        algorithm: KeyFamily::Rsa,
        pem: Some(GATEWAY_PUBLIC.to_string()),
        ..KeyConfig::default()
    };

    let route = |name: &str, paths: &[&str]| RouteConfig {
        name: name.into(),
        paths: paths.iter().map(|p| p.to_string()).collect(),
        target: backend.into(),
        requires_auth: true,
        rewrite: None,
    };

    let mut collab = route("collab-service", &["/api/collab/**"]);
    collab.rewrite = Some(RewriteConfig {
        pattern: "/api/collab/(?<segment>.*)".into(),
        replacement: "/api/${segment}".into(),
    });

    let mut docs = route("docs", &["/docs/**"]);
    docs.requires_auth = false;

    config.routes = vec![
        route("user-service", &["/api/users/**", "/api/auth/**"]),
        route("project-service", &["/api/projects/**"]),
        route("notification-service", &["/api/notifications/**"]),
        collab,
        docs,
    ];
    config
}

/// Forwarder that records what it was asked to send and answers 200.
#[derive(Default)]
pub struct RecordingForwarder {
    seen: Mutex<Vec<(RoutingDecision, HeaderMap)>>,
}

impl RecordingForwarder {
    pub fn calls(&self) -> Vec<(RoutingDecision, HeaderMap)> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> (RoutingDecision, HeaderMap) {
        self.calls().pop().expect("nothing was forwarded")
    }
}

#[async_trait]
impl Forwarder for RecordingForwarder {
    async fn forward(
        &self,
        decision: &RoutingDecision,
        request: Request<Body>,
        _client_addr: Option<SocketAddr>,
    ) -> Result<Response, ForwardError> {
        self.seen
            .lock()
            .unwrap()
            .push((decision.clone(), request.headers().clone()));
        Ok((StatusCode::OK, "forwarded").into_response())
    }
}

/// Verifier that counts invocations and rejects everything.
#[derive(Default)]
pub struct CountingVerifier {
    calls: AtomicUsize,
}

impl CountingVerifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialVerifier for CountingVerifier {
    fn verify_at(&self, _token: &str, _now: DateTime<Utc>) -> Result<Claims, TokenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TokenError::InvalidSignature)
    }
}

/// Verifier that panics, to exercise fault containment.
pub struct PanickingVerifier;

impl CredentialVerifier for PanickingVerifier {
    fn verify_at(&self, _token: &str, _now: DateTime<Utc>) -> Result<Claims, TokenError> {
        panic!("verifier fault");
    }
}
