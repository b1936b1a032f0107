//! Gateway-generated responses.
//!
//! # Responsibilities
//! - Serialize rejections into the stable JSON error contract
//! - Fall back to a hand-assembled body if serialization ever fails
//! - Render the upstream-unavailable fallback
//!
//! # Design Decisions
//! - A body is always produced; this path never fails
//! - No internal diagnostics (key material, error chains) reach the client
//! - Security headers on every gateway-generated error

use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::security::headers::apply_security_headers;

/// Stable, machine-readable rejection codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingAuthHeader,
    InvalidAuthHeader,
    InvalidToken,
    TokenProcessingError,
    AuthServiceError,
    RouteNotFound,
    InvalidRequestPath,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingAuthHeader => "MISSING_AUTH_HEADER",
            ErrorCode::InvalidAuthHeader => "INVALID_AUTH_HEADER",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::TokenProcessingError => "TOKEN_PROCESSING_ERROR",
            ErrorCode::AuthServiceError => "AUTH_SERVICE_ERROR",
            ErrorCode::RouteNotFound => "ROUTE_NOT_FOUND",
            ErrorCode::InvalidRequestPath => "INVALID_REQUEST_PATH",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::MissingAuthHeader
            | ErrorCode::InvalidAuthHeader
            | ErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ErrorCode::TokenProcessingError | ErrorCode::AuthServiceError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::RouteNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidRequestPath => StatusCode::BAD_REQUEST,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::MissingAuthHeader => "Authorization header is missing",
            ErrorCode::InvalidAuthHeader => "Invalid Authorization header format",
            ErrorCode::InvalidToken => "Invalid or expired JWT token",
            ErrorCode::TokenProcessingError => "Error processing JWT token",
            ErrorCode::AuthServiceError => "Authentication service error",
            ErrorCode::RouteNotFound => "No route matches the requested path",
            ErrorCode::InvalidRequestPath => "Request path is not in canonical form",
        }
    }
}

/// Rejection body. Field names are a public contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    pub error_code: ErrorCode,
    pub status: u16,
    pub status_text: String,
    pub timestamp: String,
    pub path: String,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, path: &str) -> Self {
        Self::at(code, path, Utc::now())
    }

    pub fn at(code: ErrorCode, path: &str, now: DateTime<Utc>) -> Self {
        let status = code.status();
        Self {
            message: code.message().to_string(),
            error_code: code,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            path: path.to_string(),
        }
    }

    /// JSON body, or the minimal fallback if serialization fails.
    pub fn to_body(&self) -> String {
        match serde_json::to_string(self) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, error_code = self.error_code.as_str(), "Error serializing error response");
                fallback_body(&self.message, self.error_code.as_str(), self.status)
            }
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        json_response(status, self.to_body())
    }
}

/// Hand-assembled body carrying at least `errorCode` and `status`.
pub fn fallback_body(message: &str, error_code: &str, status: u16) -> String {
    format!(
        "{{\"error\":\"{}\",\"errorCode\":\"{}\",\"status\":{}}}",
        escape_json(message),
        escape_json(error_code),
        status
    )
}

fn escape_json(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Returned when the forwarding collaborator cannot reach a backend.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamUnavailable {
    pub error: String,
    pub status: u16,
    pub message: String,
}

impl UpstreamUnavailable {
    pub fn new(route: &str) -> Self {
        Self {
            error: format!("{route} is currently unavailable"),
            status: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            message: "Please try again later".to_string(),
        }
    }
}

impl IntoResponse for UpstreamUnavailable {
    fn into_response(self) -> Response {
        let body = serde_json::to_string(&self).unwrap_or_else(|_| {
            fallback_body(&self.error, "SERVICE_UNAVAILABLE", self.status)
        });
        json_response(StatusCode::SERVICE_UNAVAILABLE, body)
    }
}

fn json_response(status: StatusCode, body: String) -> Response {
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    apply_security_headers(headers);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_body_shape() {
        let err = ErrorResponse::new(ErrorCode::MissingAuthHeader, "/api/projects");
        let body: Value = serde_json::from_str(&err.to_body()).unwrap();

        assert_eq!(body["message"], "Authorization header is missing");
        assert_eq!(body["errorCode"], "MISSING_AUTH_HEADER");
        assert_eq!(body["status"], 401);
        assert_eq!(body["statusText"], "Unauthorized");
        assert_eq!(body["path"], "/api/projects");
        assert!(DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
        assert_eq!(body.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_codes_map_to_statuses() {
        assert_eq!(ErrorCode::InvalidAuthHeader.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorCode::TokenProcessingError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::AuthServiceError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ErrorCode::RouteNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::InvalidRequestPath.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_serialized_code_matches_as_str() {
        for code in [
            ErrorCode::MissingAuthHeader,
            ErrorCode::InvalidAuthHeader,
            ErrorCode::InvalidToken,
            ErrorCode::TokenProcessingError,
            ErrorCode::AuthServiceError,
            ErrorCode::RouteNotFound,
            ErrorCode::InvalidRequestPath,
        ] {
            assert_eq!(serde_json::to_value(code).unwrap(), code.as_str());
        }
    }

    #[test]
    fn test_fallback_body_is_valid_json() {
        let body = fallback_body("bad \"quote\"\n", "INVALID_TOKEN", 401);
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["errorCode"], "INVALID_TOKEN");
        assert_eq!(parsed["status"], 401);
        assert_eq!(parsed["error"], "bad \"quote\"\n");
    }

    #[test]
    fn test_into_response_sets_headers() {
        let response = ErrorResponse::new(ErrorCode::InvalidToken, "/x").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
    }

    #[test]
    fn test_upstream_unavailable() {
        let response = UpstreamUnavailable::new("project-service").into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
