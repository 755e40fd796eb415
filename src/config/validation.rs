//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//! - Validate every route the way the registry would register it
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::{ConfiguredKind, RouteConfig, RouterConfig};
use crate::routing::components::UriComponents;
use crate::routing::matcher::PathPattern;
use crate::routing::route::RouteOptions;
use crate::routing::router::{RegistrationError, RouteRegistry};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),

    #[error("listener.request_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("routing.base_url {0:?} is not an http(s) URL")]
    InvalidBaseUrl(String),

    #[error("route #{index} has an empty path")]
    EmptyPath { index: usize },

    #[error("route {path} has no route_to")]
    MissingTarget { path: String },

    #[error("redirect route {path} has no redirect_to")]
    MissingRedirect { path: String },

    #[error("route {path} allows unknown method {method:?}")]
    UnknownMethod { path: String, method: String },

    #[error("route {path} lists invalid language code {language:?}")]
    InvalidLanguage { path: String, language: String },

    #[error("route {path} uses variable {{{name}}} more than once")]
    DuplicateVariable { path: String, name: String },

    #[error("route {path} has vars_values for unknown variable {name:?}")]
    UnknownVariable { path: String, name: String },

    #[error("route {path} is defined more than once")]
    DuplicatePath { path: String },
}

const KNOWN_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::CONNECT,
    Method::TRACE,
];

/// Parse a method token (case-insensitive). Extension methods are rejected.
pub fn parse_method(token: &str) -> Option<Method> {
    let upper = token.trim().to_ascii_uppercase();
    KNOWN_METHODS.into_iter().find(|m| m.as_str() == upper)
}

/// Two ASCII letters, e.g. `en`.
pub fn is_language_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let base_url = &config.routing.base_url;
    if !base_url.is_empty() {
        let valid = url::Url::parse(base_url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidBaseUrl(base_url.clone()));
        }
    }

    // Same collision rules as the live registry; targets are placeholders.
    let mut scratch = RouteRegistry::new();
    if config.routing.sitemap {
        let _ = scratch.include_sitemap_routes();
    }

    for (index, route) in config.routes.iter().enumerate() {
        if route.path.trim().is_empty() {
            errors.push(ValidationError::EmptyPath { index });
            continue;
        }
        validate_route(route, &mut errors);

        let options = RouteOptions::new(route.path.as_str())
            .case_sensitive(route.case_sensitive)
            .callable(|_, _| {});
        if let Err(RegistrationError::Duplicate { path }) = scratch.closure(options) {
            errors.push(ValidationError::DuplicatePath { path });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(route: &RouteConfig, errors: &mut Vec<ValidationError>) {
    let components = UriComponents::parse(&route.path);
    let path = components.display_path();

    match route.kind {
        ConfiguredKind::Redirect => {
            if route.redirect_to.as_deref().map_or(true, |t| t.trim().is_empty()) {
                errors.push(ValidationError::MissingRedirect { path: path.clone() });
            }
        }
        _ => {
            if route.route_to.as_deref().map_or(true, |t| t.trim().is_empty()) {
                errors.push(ValidationError::MissingTarget { path: path.clone() });
            }
        }
    }

    for method in &route.methods {
        if parse_method(method).is_none() {
            errors.push(ValidationError::UnknownMethod {
                path: path.clone(),
                method: method.clone(),
            });
        }
    }

    for language in &route.languages {
        if !is_language_code(language) {
            errors.push(ValidationError::InvalidLanguage {
                path: path.clone(),
                language: language.clone(),
            });
        }
    }

    match PathPattern::new(components.segments(), route.case_sensitive) {
        Ok(pattern) => {
            let names: HashSet<&str> = pattern.variable_names().collect();
            let mut unknown: Vec<&String> = route
                .vars_values
                .keys()
                .filter(|k| !names.contains(k.as_str()))
                .collect();
            unknown.sort();
            for name in unknown {
                errors.push(ValidationError::UnknownVariable {
                    path: path.clone(),
                    name: name.clone(),
                });
            }
        }
        Err(dup) => errors.push(ValidationError::DuplicateVariable {
            path: path.clone(),
            name: dup.0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(path: &str) -> RouteConfig {
        RouteConfig {
            route_to: Some("page.html".into()),
            ..RouteConfig::new(path, ConfiguredKind::View)
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RouterConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = RouterConfig::default();
        config.listener.bind_address = "not an address".into();
        config.listener.request_timeout_secs = 0;
        config.routing.base_url = "ftp://example.com".into();

        let mut bad = view("/a/{id}/{id}");
        bad.methods = vec!["get".into(), "FETCH".into()];
        bad.languages = vec!["en".into(), "english".into()];
        config.routes.push(bad);
        config.routes.push(RouteConfig::new("/r", ConfiguredKind::Redirect));
        config.routes.push(RouteConfig::new("", ConfiguredKind::View));

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidBindAddress("not an address".into())));
        assert!(errors.contains(&ValidationError::ZeroTimeout));
        assert!(errors.contains(&ValidationError::InvalidBaseUrl("ftp://example.com".into())));
        assert!(errors.contains(&ValidationError::UnknownMethod {
            path: "/a/{id}/{id}".into(),
            method: "FETCH".into()
        }));
        assert!(errors.contains(&ValidationError::InvalidLanguage {
            path: "/a/{id}/{id}".into(),
            language: "english".into()
        }));
        assert!(errors.contains(&ValidationError::DuplicateVariable {
            path: "/a/{id}/{id}".into(),
            name: "id".into()
        }));
        assert!(errors.contains(&ValidationError::MissingRedirect { path: "/r".into() }));
        assert!(errors.contains(&ValidationError::EmptyPath { index: 2 }));
    }

    #[test]
    fn test_duplicate_paths() {
        let mut config = RouterConfig::default();
        config.routes.push(view("/about"));
        config.routes.push(view("/about/"));
        config.routes.push(view("/users/{id}"));
        config.routes.push(view("/users/{name}"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DuplicatePath { path: "/about".into() }]);
    }

    #[test]
    fn test_sitemap_paths_are_reserved() {
        let mut config = RouterConfig::default();
        config.routing.sitemap = true;
        config.routes.push(view("/sitemap.xml"));
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DuplicatePath { path: "/sitemap.xml".into() }]);
    }

    #[test]
    fn test_unknown_var_values_key() {
        let mut config = RouterConfig::default();
        let mut route = view("/shop/{cat}");
        route.vars_values.insert("cat".into(), vec!["books".into()]);
        route.vars_values.insert("page".into(), vec!["1".into()]);
        config.routes.push(route);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnknownVariable {
                path: "/shop/{cat}".into(),
                name: "page".into()
            }]
        );
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("get"), Some(Method::GET));
        assert_eq!(parse_method(" DELETE "), Some(Method::DELETE));
        assert_eq!(parse_method("BREW"), None);
    }
}
