//! Route lookup.
//!
//! # Responsibilities
//! - Compile route configuration into an immutable table
//! - Look up the most specific route for a request path
//! - Produce the routing decision handed to the forwarder
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes sorted once by specificity; ties keep declaration order
//! - O(n) pattern scan (acceptable for typical route counts)
//! - Explicit `None` rather than a silent default route

use std::collections::{HashMap, HashSet};

use regex::Regex;
use url::Url;

use crate::config::schema::{RewriteConfig, RouteConfig};
use crate::config::{ConfigError, ValidationError};
use crate::routing::matcher::PathPattern;

/// Compiled regex rewrite.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    regex: Regex,
    replacement: String,
}

impl RewriteRule {
    pub fn new(config: &RewriteConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(&config.pattern)?,
            replacement: config.replacement.clone(),
        })
    }

    /// Rewrite `path`; an empty result becomes `/`.
    pub fn apply(&self, path: &str) -> String {
        let rewritten = self.regex.replace_all(path, self.replacement.as_str());
        if rewritten.is_empty() {
            "/".to_string()
        } else {
            rewritten.into_owned()
        }
    }
}

/// A single compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub pattern: PathPattern,
    pub target: Url,
    pub requires_auth: bool,
    pub rewrite: Option<RewriteRule>,
}

/// Where and how to forward one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub route: String,
    pub target: Url,
    /// Path to send upstream, after any rewrite.
    pub path: String,
    pub requires_auth: bool,
}

/// What a duplicate pattern must agree on to be tolerated.
#[derive(PartialEq, Eq)]
struct RoutePolicy {
    target: Url,
    requires_auth: bool,
    rewrite: Option<RewriteConfig>,
}

/// Immutable path → route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile the route list, reporting every problem found.
    pub fn load(configs: &[RouteConfig]) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();
        let mut routes = Vec::new();
        let mut names = HashSet::new();
        let mut seen: HashMap<String, RoutePolicy> = HashMap::new();

        for config in configs {
            let field = format!("routes[{}]", config.name);

            if config.name.trim().is_empty() {
                errors.push(ValidationError::new("routes", "route name must not be empty"));
            } else if !names.insert(config.name.as_str()) {
                errors.push(ValidationError::new(&field, "duplicate route name"));
            }

            if config.paths.is_empty() {
                errors.push(ValidationError::new(
                    format!("{field}.paths"),
                    "at least one path pattern is required",
                ));
            }

            let target = match parse_target(&config.target) {
                Ok(url) => Some(url),
                Err(message) => {
                    errors.push(ValidationError::new(format!("{field}.target"), message));
                    None
                }
            };

            let rewrite = match config.rewrite.as_ref().map(RewriteRule::new).transpose() {
                Ok(rule) => rule,
                Err(e) => {
                    errors.push(ValidationError::new(format!("{field}.rewrite"), e.to_string()));
                    None
                }
            };

            for raw in &config.paths {
                let pattern = match PathPattern::parse(raw) {
                    Ok(p) => p,
                    Err(e) => {
                        errors.push(ValidationError::new(format!("{field}.paths"), e.to_string()));
                        continue;
                    }
                };

                let Some(target) = target.clone() else { continue };
                let key = pattern.to_string();
                let policy = RoutePolicy {
                    target: target.clone(),
                    requires_auth: config.requires_auth,
                    rewrite: config.rewrite.clone(),
                };

                match seen.get(&key) {
                    Some(existing) if *existing == policy => {
                        // identical duplicate, first declaration wins
                        continue;
                    }
                    Some(_) => {
                        errors.push(ValidationError::new(
                            format!("{field}.paths"),
                            format!("`{key}` is already routed to a different target or with a different policy"),
                        ));
                        continue;
                    }
                    None => {
                        seen.insert(key, policy);
                    }
                }

                routes.push(Route {
                    name: config.name.clone(),
                    pattern,
                    target,
                    requires_auth: config.requires_auth,
                    rewrite: rewrite.clone(),
                });
            }
        }

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        // Stable: equal specificity keeps declaration order.
        routes.sort_by(|a, b| b.pattern.specificity().cmp(&a.pattern.specificity()));

        Ok(Self { routes })
    }

    /// Most specific route covering `path`.
    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.pattern.matches(path))
    }

    /// Resolve `path` into a forwarding decision.
    pub fn resolve(&self, path: &str) -> Option<RoutingDecision> {
        let route = self.match_path(path)?;
        let upstream_path = match &route.rewrite {
            Some(rule) => rule.apply(path),
            None => path.to_string(),
        };
        Some(RoutingDecision {
            route: route.name.clone(),
            target: route.target.clone(),
            path: upstream_path,
            requires_auth: route.requires_auth,
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn parse_target(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| format!("`{raw}` is not an absolute URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("`{raw}` must use http or https"));
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(format!("`{raw}` has no host")),
    }
}
