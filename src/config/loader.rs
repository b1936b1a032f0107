//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading and startup construction.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable `{0}` is not set and has no default")]
    MissingEnv(String),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("invalid verification key: {0}")]
    Key(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, expand and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let raw = fs::read_to_string(path)?;
    parse_config(&raw, |name| std::env::var(name).ok())
}

/// Parse configuration text, resolving placeholders through `lookup`.
pub fn parse_config<F>(raw: &str, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let content = expand_env(raw, lookup)?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// `${NAME}`, `${NAME:default}` and the `$${...}` escape.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(\$?)\{([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}").unwrap()
});

/// Expand `${NAME}` and `${NAME:default}` placeholders.
///
/// `$${...}` is an escape and yields a literal `${...}`, for regex rewrite
/// replacements that refer to named groups.
pub fn expand_env<F>(raw: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(raw) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&raw[last..whole.start()]);
        last = whole.end();

        if !caps[1].is_empty() {
            out.push_str(&whole.as_str()[1..]);
            continue;
        }

        let name = &caps[2];
        let value = match (lookup(name), caps.get(3)) {
            (Some(value), _) => value,
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => return Err(ConfigError::MissingEnv(name.to_string())),
        };
        out.push_str(&value);
    }
    out.push_str(&raw[last..]);
    Ok(out)
}
