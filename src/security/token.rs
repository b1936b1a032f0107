//! Access token verification.
//!
//! # Responsibilities
//! - Check the compact `header.payload.signature` structure
//! - Verify the signature against the configured key's algorithm family
//! - Check expiration against the wall clock (no leeway unless configured)
//! - Require `tokenType == ACCESS`
//!
//! # Design Decisions
//! - Every failure is a `TokenError` value; nothing panics or escapes
//! - Verification is synchronous and touches neither disk nor network
//! - The clock is a parameter (`verify_at`) so expiry is testable

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Validation};
use serde_json::{Map, Value};

use crate::security::keys::VerificationKey;

/// Upper bound for configured leeway.
const MAX_LEEWAY_SECS: u64 = 24 * 60 * 60;

/// Why a credential was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is not a compact header.payload.signature structure")]
    Malformed,
    #[error("token signature does not verify against the configured key")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not an access token")]
    WrongTokenType,
}

impl TokenError {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed_token",
            TokenError::InvalidSignature => "invalid_signature",
            TokenError::Expired => "expired_token",
            TokenError::WrongTokenType => "wrong_token_type",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm
            | ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidRsaKey(_) => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Token category carried in the `tokenType` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "ACCESS",
            TokenType::Refresh => "REFRESH",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ACCESS" => Some(TokenType::Access),
            "REFRESH" => Some(TokenType::Refresh),
            _ => None,
        }
    }
}

/// Decoded token payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    raw: Map<String, Value>,
}

impl Claims {
    pub fn new(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    /// Look up any claim by name.
    pub fn extract(&self, name: &str) -> Option<&Value> {
        self.raw.get(name).filter(|v| !v.is_null())
    }

    pub fn subject(&self) -> Option<&str> {
        self.extract("sub").and_then(Value::as_str)
    }

    pub fn role(&self) -> Option<&str> {
        self.extract("role").and_then(Value::as_str)
    }

    pub fn token_type(&self) -> Option<TokenType> {
        self.extract("tokenType")
            .and_then(Value::as_str)
            .and_then(TokenType::parse)
    }

    /// `exp` in seconds since the epoch, whether or not chrono can represent it.
    pub fn expiry_secs(&self) -> Option<i64> {
        self.extract("exp").and_then(epoch_secs)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.extract("exp").and_then(timestamp)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.extract("iat").and_then(timestamp)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.raw
    }
}

fn epoch_secs(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(epoch_secs(value)?, 0)
}

/// Anything that can turn a credential into verified claims.
pub trait CredentialVerifier: Send + Sync {
    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError>;
}

/// Verifies tokens against a single immutable key.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    key: VerificationKey,
    validation: Validation,
    leeway_secs: i64,
}

impl TokenVerifier {
    pub fn new(key: VerificationKey, leeway_secs: u64) -> Self {
        let algorithms = key.algorithms();
        let mut validation = Validation::new(algorithms[0]);
        validation.algorithms = algorithms;
        // exp/aud handled here so the check order and leeway are ours
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            key,
            validation,
            leeway_secs: leeway_secs.min(MAX_LEEWAY_SECS) as i64,
        }
    }

    /// Verify against the current wall clock.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }
}

impl CredentialVerifier for TokenVerifier {
    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        if token.split('.').count() != 3 {
            return Err(TokenError::Malformed);
        }

        let data = decode::<Map<String, Value>>(token, self.key.decoding_key(), &self.validation)?;
        let claims = Claims::new(data.claims);

        // a token without a readable exp is never considered live
        let deadline = claims
            .expiry_secs()
            .map(|exp| exp.saturating_add(self.leeway_secs));
        match deadline {
            Some(deadline) if now.timestamp() < deadline => {}
            _ => return Err(TokenError::Expired),
        }

        if claims.token_type() != Some(TokenType::Access) {
            return Err(TokenError::WrongTokenType);
        }

        Ok(claims)
    }
}
