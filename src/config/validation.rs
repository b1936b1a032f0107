//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check key material is complete and unambiguous
//! - Detect conflicting routes (delegated to the route table compiler)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use axum::http::Method;

use crate::config::loader::ConfigError;
use crate::config::schema::{GatewayConfig, KeyConfig, KeyFamily};
use crate::routing::{PathPattern, RouteTable};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted location of the offending value.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::new("listener.bind_address", "must not be empty"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }

    match RouteTable::load(&config.routes) {
        Ok(_) => {}
        Err(ConfigError::Validation(route_errors)) => errors.extend(route_errors),
        Err(other) => errors.push(ValidationError::new("routes", other.to_string())),
    }

    for (i, pattern) in config.auth.public_paths.iter().enumerate() {
        if let Err(e) = PathPattern::parse(pattern) {
            errors.push(ValidationError::new(
                format!("auth.public_paths[{i}]"),
                e.to_string(),
            ));
        }
    }

    validate_key(&config.auth.key, &mut errors);

    for method in &config.cors.allowed_methods {
        if method.parse::<Method>().is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_methods",
                format!("`{method}` is not an HTTP method"),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address (e.g. 0.0.0.0:9090)",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_ref().is_some_and(|v| !v.trim().is_empty())
}

fn validate_key(key: &KeyConfig, errors: &mut Vec<ValidationError>) {
    let has_pem = present(&key.pem);
    let has_path = key.pem_path.is_some();
    let has_secret = present(&key.secret);

    match key.algorithm {
        KeyFamily::Rsa | KeyFamily::Ec => {
            if has_pem == has_path {
                errors.push(ValidationError::new(
                    "auth.key",
                    "exactly one of `pem` or `pem_path` is required for a public key",
                ));
            }
            if has_secret {
                errors.push(ValidationError::new(
                    "auth.key.secret",
                    "a shared secret cannot be combined with a public key algorithm",
                ));
            }
        }
        KeyFamily::Hmac => {
            if !has_secret {
                errors.push(ValidationError::new(
                    "auth.key.secret",
                    "a non-empty secret is required for hmac",
                ));
            }
            if has_pem || has_path {
                errors.push(ValidationError::new(
                    "auth.key",
                    "`pem`/`pem_path` cannot be combined with hmac",
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    fn hmac_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.auth.key = KeyConfig {
            algorithm: KeyFamily::Hmac,
            secret: Some("0123456789abcdef0123456789abcdef".into()),
            ..KeyConfig::default()
        };
        config.routes.push(RouteConfig {
            name: "projects".into(),
            paths: vec!["/api/projects/**".into()],
            target: "http://localhost:8083".into(),
            requires_auth: true,
            rewrite: None,
        });
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&hmac_config()).is_ok());
    }

    #[test]
    fn test_all_errors_are_reported() {
        let mut config = hmac_config();
        config.timeouts.request_secs = 0;
        config.auth.key.secret = None;
        config.auth.public_paths.push("no-leading-slash".into());
        config.cors.allowed_methods.push("NOT A METHOD".into());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"timeouts.request_secs"));
        assert!(fields.contains(&"auth.key.secret"));
        assert!(fields.iter().any(|f| f.starts_with("auth.public_paths")));
        assert!(fields.contains(&"cors.allowed_methods"));
    }

    #[test]
    fn test_public_key_needs_exactly_one_source() {
        let mut config = hmac_config();
        config.auth.key = KeyConfig {
            algorithm: KeyFamily::Rsa,
            pem: Some("-----BEGIN PUBLIC KEY-----".into()),
            pem_path: Some("keys/public.pem".into()),
            secret: None,
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "auth.key");

        config.auth.key.pem = None;
        config.auth.key.pem_path = None;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_route_errors_are_merged() {
        let mut config = hmac_config();
        config.routes[0].target = "localhost:8083".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "routes[projects].target");
    }
}
