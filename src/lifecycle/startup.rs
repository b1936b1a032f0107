//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the verification key exactly once
//! - Compile the route table and public-path set
//! - Assemble the immutable state every request reads from
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Nothing built here is mutated after construction

use std::sync::Arc;

use crate::config::validation::validate_config;
use crate::config::{ConfigError, GatewayConfig, ValidationError};
use crate::routing::RouteTable;
use crate::security::access_control::{AuthFilter, PublicPaths};
use crate::security::keys::VerificationKey;
use crate::security::token::{CredentialVerifier, TokenVerifier};

/// Process-wide, read-only gateway state.
pub struct GatewayState {
    config: GatewayConfig,
    filter: AuthFilter,
}

impl GatewayState {
    /// Validate `config`, load its key and compile the routes.
    pub fn build(config: &GatewayConfig) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let key = VerificationKey::from_config(&config.auth.key)?;
        tracing::info!(family = ?key.family(), "Verification key loaded");

        let verifier = TokenVerifier::new(key, config.auth.leeway_secs);
        Self::with_verifier(config, Arc::new(verifier))
    }

    /// Assemble state around an already constructed verifier.
    pub fn with_verifier(
        config: &GatewayConfig,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Result<Self, ConfigError> {
        let routes = RouteTable::load(&config.routes)?;
        let public_paths = PublicPaths::new(&config.auth.public_paths).map_err(|e| {
            ConfigError::Validation(vec![ValidationError::new("auth.public_paths", e.to_string())])
        })?;

        tracing::info!(
            routes = routes.len(),
            public_paths = config.auth.public_paths.len(),
            "Route table compiled"
        );

        Ok(Self {
            config: config.clone(),
            filter: AuthFilter::new(Arc::new(routes), public_paths, verifier),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn filter(&self) -> &AuthFilter {
        &self.filter
    }

    pub fn routes(&self) -> &RouteTable {
        self.filter.routes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KeyConfig, KeyFamily, RouteConfig};

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.auth.key = KeyConfig {
            algorithm: KeyFamily::Hmac,
            secret: Some("startup-secret".into()),
            ..KeyConfig::default()
        };
        config.routes = vec![RouteConfig {
            name: "projects".into(),
            paths: vec!["/api/projects/**".into()],
            target: "http://localhost:8083".into(),
            requires_auth: true,
            rewrite: None,
        }];
        config
    }

    #[test]
    fn test_build_compiles_routes() {
        let state = GatewayState::build(&config()).unwrap();
        assert_eq!(state.routes().len(), 1);
        assert!(state.routes().resolve("/api/projects/1").is_some());
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let mut config = config();
        config.auth.key = KeyConfig::default();
        assert!(GatewayState::build(&config).is_err());
    }

    #[test]
    fn test_unreadable_key_is_fatal() {
        let mut config = config();
        config.auth.key = KeyConfig {
            algorithm: KeyFamily::Rsa,
            pem: Some("not a key".into()),
            ..KeyConfig::default()
        };
        assert!(matches!(GatewayState::build(&config), Err(ConfigError::Key(_))));
    }

    #[test]
    fn test_invalid_routes_are_fatal() {
        let mut config = config();
        config.routes[0].target = "nowhere".into();
        assert!(matches!(
            GatewayState::build(&config),
            Err(ConfigError::Validation(_))
        ));
    }
}
