//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address, timeouts).
    pub listener: ListenerConfig,

    /// Registry-wide routing settings.
    pub routing: RoutingConfig,

    /// Routes registered at startup, in order.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Registry-wide routing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Prefix for route listings and sitemap `<loc>` entries.
    pub base_url: String,

    /// Root for custom-kind file targets.
    pub app_root: String,

    /// API file targets, relative to `app_root`.
    pub apis_dir: String,

    /// View file targets, relative to `app_root`.
    pub pages_dir: String,

    /// Unmatched requests under this prefix get JSON 404 bodies.
    pub api_prefix: String,

    /// Register `/sitemap` and `/sitemap.xml`.
    pub sitemap: bool,

    pub redirect_to_non_www: bool,

    /// Answer a starter page while no routes are registered.
    pub starter_page: bool,

    /// Let a `before` hook that terminates the response stop the chain.
    pub short_circuit_middleware: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            app_root: ".".to_string(),
            apis_dir: "apis".to_string(),
            pages_dir: "pages".to_string(),
            api_prefix: "/apis".to_string(),
            sitemap: false,
            redirect_to_non_www: false,
            starter_page: true,
            short_circuit_middleware: false,
        }
    }
}

/// How a configured route is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfiguredKind {
    #[default]
    View,
    Api,
    Custom,
    Redirect,
}

/// One route from the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path template, e.g. `/blog/{year}/{slug}`.
    pub path: String,

    #[serde(default)]
    pub kind: ConfiguredKind,

    /// File path or controller name.
    #[serde(default)]
    pub route_to: Option<String>,

    /// Allowed methods; empty means any.
    #[serde(default)]
    pub methods: Vec<String>,

    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,

    #[serde(default)]
    pub middleware: Vec<String>,

    #[serde(default)]
    pub in_sitemap: bool,

    /// Two-letter language codes for sitemap alternates.
    #[serde(default)]
    pub languages: Vec<String>,

    /// Sitemap example values per variable.
    #[serde(default)]
    pub vars_values: HashMap<String, Vec<String>>,

    /// Action invoked on an action controller.
    #[serde(default)]
    pub action: Option<String>,

    #[serde(default)]
    pub as_api: bool,

    /// Redirect target for `kind = "redirect"`.
    #[serde(default)]
    pub redirect_to: Option<String>,

    #[serde(default = "default_redirect_code")]
    pub redirect_code: u16,
}

fn default_case_sensitive() -> bool {
    true
}

fn default_redirect_code() -> u16 {
    301
}

impl RouteConfig {
    /// Route with defaults for everything but the path and kind.
    pub fn new(path: impl Into<String>, kind: ConfiguredKind) -> Self {
        Self {
            path: path.into(),
            kind,
            route_to: None,
            methods: Vec::new(),
            case_sensitive: default_case_sensitive(),
            middleware: Vec::new(),
            in_sitemap: false,
            languages: Vec::new(),
            vars_values: HashMap::new(),
            action: None,
            as_api: false,
            redirect_to: None,
            redirect_code: default_redirect_code(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the `/admin/*` routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: RouterConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(config.routing.starter_page);
        assert!(!config.routing.short_circuit_middleware);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_route_table() {
        let config: RouterConfig = toml::from_str(
            r#"
            [routing]
            base_url = "https://example.com"
            sitemap = true

            [[routes]]
            path = "/blog/{year}/{slug}"
            route_to = "blog/post.html"
            methods = ["GET"]
            in_sitemap = true
            languages = ["en", "ar"]
            vars_values = { year = ["2024"], slug = ["hello-world"] }

            [[routes]]
            path = "/old"
            kind = "redirect"
            redirect_to = "/new"
            "#,
        )
        .unwrap();

        assert_eq!(config.routes.len(), 2);
        let blog = &config.routes[0];
        assert_eq!(blog.kind, ConfiguredKind::View);
        assert!(blog.case_sensitive);
        assert_eq!(blog.vars_values["year"], ["2024"]);

        let old = &config.routes[1];
        assert_eq!(old.kind, ConfiguredKind::Redirect);
        assert_eq!(old.redirect_code, 301);
    }
}
