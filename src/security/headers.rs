//! Header manipulation: identity propagation and hardening.
//!
//! # Responsibilities
//! - Build the identity context from verified claims
//! - Inject identity headers for downstream services
//! - Strip client-supplied identity and hop-by-hop headers
//! - Add security headers to gateway-generated responses
//!
//! # Design Decisions
//! - Identity header names are a stable contract with downstream services
//! - Identity headers are removed from every inbound request, verified or not
//! - Never trust identity claims that did not come from a verified token

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use chrono::{DateTime, Utc};

use crate::security::token::{Claims, TokenType};

pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub const X_USER_NAME: HeaderName = HeaderName::from_static("x-user-name");
pub const X_USER_ROLE: HeaderName = HeaderName::from_static("x-user-role");
pub const X_REQUEST_SOURCE: HeaderName = HeaderName::from_static("x-request-source");
pub const X_REQUEST_TIME: HeaderName = HeaderName::from_static("x-request-time");
pub const X_TOKEN_TYPE: HeaderName = HeaderName::from_static("x-token-type");

/// Every header the gateway owns on forwarded requests.
pub const IDENTITY_HEADERS: [HeaderName; 6] = [
    X_USER_ID,
    X_USER_NAME,
    X_USER_ROLE,
    X_REQUEST_SOURCE,
    X_REQUEST_TIME,
    X_TOKEN_TYPE,
];

pub const REQUEST_SOURCE: &str = "api-gateway";
pub const DEFAULT_ROLE: &str = "USER";

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Claims could be verified but not turned into an identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("token has no usable subject")]
    MissingSubject,
    #[error("role claim is not a string")]
    InvalidRole,
    #[error("identity cannot be carried in a header: {0}")]
    Header(String),
}

impl From<InvalidHeaderValue> for IdentityError {
    fn from(err: InvalidHeaderValue) -> Self {
        IdentityError::Header(err.to_string())
    }
}

/// Verified principal for one request. Never read back from inbound headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    pub subject: String,
    pub role: String,
}

impl IdentityContext {
    pub fn from_claims(claims: &Claims) -> Result<Self, IdentityError> {
        let subject = claims
            .subject()
            .filter(|s| !s.is_empty())
            .ok_or(IdentityError::MissingSubject)?;

        let role = match claims.extract("role") {
            None => DEFAULT_ROLE,
            Some(value) => value.as_str().ok_or(IdentityError::InvalidRole)?,
        };

        Ok(Self {
            subject: subject.to_string(),
            role: role.to_string(),
        })
    }

    /// Write identity headers, replacing any existing values.
    ///
    /// Values are validated before anything is written, so a failure leaves
    /// `headers` untouched.
    pub fn apply(&self, headers: &mut HeaderMap, now: DateTime<Utc>) -> Result<(), IdentityError> {
        let subject = HeaderValue::from_str(&self.subject)?;
        let role = HeaderValue::from_str(&self.role)?;
        let time = HeaderValue::from_str(&now.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())?;

        headers.insert(X_USER_ID, subject.clone());
        headers.insert(X_USER_NAME, subject);
        headers.insert(X_USER_ROLE, role);
        headers.insert(X_REQUEST_SOURCE, HeaderValue::from_static(REQUEST_SOURCE));
        headers.insert(X_REQUEST_TIME, time);
        headers.insert(
            X_TOKEN_TYPE,
            HeaderValue::from_static(TokenType::Access.as_str()),
        );
        Ok(())
    }
}

/// Remove every gateway-owned identity header.
pub fn strip_identity_headers(headers: &mut HeaderMap) {
    for name in IDENTITY_HEADERS {
        headers.remove(name);
    }
}

/// Remove connection-scoped headers that must not be forwarded.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Hardening headers for responses the gateway generates itself.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn claims(value: Value) -> Claims {
        match value {
            Value::Object(map) => Claims::new(map),
            _ => Claims::new(Map::new()),
        }
    }

    #[test]
    fn test_identity_from_claims() {
        let identity =
            IdentityContext::from_claims(&claims(json!({"sub": "alice", "role": "ADMIN"}))).unwrap();
        assert_eq!(identity.subject, "alice");
        assert_eq!(identity.role, "ADMIN");
    }

    #[test]
    fn test_role_defaults_to_user() {
        let identity = IdentityContext::from_claims(&claims(json!({"sub": "bob"}))).unwrap();
        assert_eq!(identity.role, DEFAULT_ROLE);
    }

    #[test]
    fn test_unusable_claims() {
        assert_eq!(
            IdentityContext::from_claims(&claims(json!({"role": "ADMIN"}))),
            Err(IdentityError::MissingSubject)
        );
        assert_eq!(
            IdentityContext::from_claims(&claims(json!({"sub": 42}))),
            Err(IdentityError::MissingSubject)
        );
        assert_eq!(
            IdentityContext::from_claims(&claims(json!({"sub": "c", "role": ["A"]}))),
            Err(IdentityError::InvalidRole)
        );
    }

    #[test]
    fn test_apply_overwrites_client_values() {
        let mut headers = HeaderMap::new();
        headers.append(X_USER_ID, HeaderValue::from_static("mallory"));
        headers.append(X_USER_ID, HeaderValue::from_static("eve"));
        headers.insert(X_USER_ROLE, HeaderValue::from_static("SUPERUSER"));

        let identity = IdentityContext {
            subject: "alice".into(),
            role: "ADMIN".into(),
        };
        identity.apply(&mut headers, Utc::now()).unwrap();

        let ids: Vec<_> = headers.get_all(X_USER_ID).iter().collect();
        assert_eq!(ids, vec![&HeaderValue::from_static("alice")]);
        assert_eq!(headers[X_USER_NAME], "alice");
        assert_eq!(headers[X_USER_ROLE], "ADMIN");
        assert_eq!(headers[X_REQUEST_SOURCE], REQUEST_SOURCE);
        assert_eq!(headers[X_TOKEN_TYPE], "ACCESS");
        assert!(headers.contains_key(X_REQUEST_TIME));
    }

    #[test]
    fn test_apply_rejects_unrepresentable_subject() {
        let mut headers = HeaderMap::new();
        let identity = IdentityContext {
            subject: "alice\r\nX-User-Role: ADMIN".into(),
            role: "USER".into(),
        };
        assert!(matches!(
            identity.apply(&mut headers, Utc::now()),
            Err(IdentityError::Header(_))
        ));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_strip_identity_headers() {
        let mut headers = HeaderMap::new();
        for name in IDENTITY_HEADERS {
            headers.insert(name, HeaderValue::from_static("spoofed"));
        }
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

        strip_identity_headers(&mut headers);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::ACCEPT));
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer x"));

        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::AUTHORIZATION));
    }
}
