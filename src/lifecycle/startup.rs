//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration (defaults when the file does not exist)
//! - Own what the application wires in code: middleware, controllers,
//!   the not-found handler and route installers
//! - Build a complete [`Dispatcher`] from a validated config
//!
//! # Design Decisions
//! - Fail fast: any registration error aborts the build
//! - Registration order: configured routes, installers, sitemap routes
//! - Reloads call [`Application::build`] again; a registry is never mutated
//!   after it starts serving

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::{ConfiguredKind, RouteConfig, RouterConfig};
use crate::config::validation::parse_method;
use crate::dispatch::controller::ControllerRegistry;
use crate::dispatch::dispatcher::{DispatchSettings, Dispatcher};
use crate::dispatch::middleware::{Middleware, MiddlewareRegistry, GLOBAL_GROUP};
use crate::routing::route::{ResourceRoots, RouteOptions};
use crate::routing::router::{NotFoundHandler, RegistrationError, RouteRegistry};
use crate::security::headers::SecurityHeaders;

/// Registers routes in code, after the configured ones.
pub type RouteInstaller = Box<dyn Fn(&mut RouteRegistry) -> Result<(), RegistrationError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to register route: {0}")]
    Registration(#[from] RegistrationError),
}

/// Composition root.
#[derive(Default)]
pub struct Application {
    middleware: MiddlewareRegistry,
    controllers: ControllerRegistry,
    not_found: Option<NotFoundHandler>,
    installers: Vec<RouteInstaller>,
}

impl Application {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a middleware, optionally as a member of groups.
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>, groups: &[&str]) -> Self {
        self.middleware.register_in(middleware, groups);
        self
    }

    pub fn middleware_mut(&mut self) -> &mut MiddlewareRegistry {
        &mut self.middleware
    }

    /// Controllers must be registered before any route names them.
    pub fn controllers_mut(&mut self) -> &mut ControllerRegistry {
        &mut self.controllers
    }

    pub fn with_not_found(mut self, handler: NotFoundHandler) -> Self {
        self.not_found = Some(handler);
        self
    }

    pub fn with_routes<F>(mut self, installer: F) -> Self
    where
        F: Fn(&mut RouteRegistry) -> Result<(), RegistrationError> + Send + Sync + 'static,
    {
        self.installers.push(Box::new(installer));
        self
    }

    /// Build a dispatcher for `config`.
    pub fn build(&self, config: &RouterConfig) -> Result<Dispatcher, StartupError> {
        let routing = &config.routing;

        let mut routes = RouteRegistry::with_controllers(Arc::new(self.controllers.clone()));
        routes.set_base_url(routing.base_url.as_str());
        routes.set_roots(ResourceRoots::new(
            routing.app_root.as_str(),
            routing.apis_dir.as_str(),
            routing.pages_dir.as_str(),
        ));
        if let Some(handler) = &self.not_found {
            routes.set_not_found(handler.clone());
        }

        for route in &config.routes {
            register_configured(&mut routes, route)?;
        }
        for installer in &self.installers {
            installer(&mut routes)?;
        }
        if routing.sitemap {
            routes.include_sitemap_routes()?;
        }

        let mut middleware = self.middleware.clone();
        if config.security.enable_headers {
            middleware.register_in(Arc::new(SecurityHeaders), &[GLOBAL_GROUP]);
        }

        tracing::info!(
            routes = routes.routes_count(),
            middleware = middleware.len(),
            sitemap = routing.sitemap,
            "Route registry built"
        );

        let settings = DispatchSettings {
            redirect_to_non_www: routing.redirect_to_non_www,
            starter_page: routing.starter_page,
            api_prefix: routing.api_prefix.clone(),
            short_circuit: routing.short_circuit_middleware,
        };
        Ok(Dispatcher::new(routes, middleware, settings))
    }
}

/// Register one route from the config file.
pub fn register_configured(routes: &mut RouteRegistry, route: &RouteConfig) -> Result<(), RegistrationError> {
    let mut options = RouteOptions::new(route.path.as_str())
        .case_sensitive(route.case_sensitive)
        .in_sitemap(route.in_sitemap)
        .languages(route.languages.iter())
        .as_api(route.as_api);
    options.vars_values = route.vars_values.clone();

    for token in &route.methods {
        let method = parse_method(token).ok_or_else(|| RegistrationError::InvalidMethod {
            path: route.path.clone(),
            method: token.clone(),
        })?;
        options = options.method(method);
    }
    for name in &route.middleware {
        options = options.middleware(name.as_str());
    }
    if let Some(action) = &route.action {
        options = options.action(action.as_str());
    }
    if let Some(target) = &route.route_to {
        options = options.route_to(target.as_str());
    }

    match route.kind {
        ConfiguredKind::Redirect => {
            let to = route.redirect_to.as_deref().unwrap_or_default();
            routes.redirect_route(options, to, route.redirect_code)
        }
        ConfiguredKind::Api => routes.api(options),
        ConfiguredKind::Custom => routes.add_route(options),
        ConfiguredKind::View => routes.view(options),
    }
}

/// Load `path`, falling back to defaults when it does not exist.
pub fn load_or_default(path: &Path) -> Result<RouterConfig, StartupError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(RouterConfig::default());
    }
    Ok(load_config(path)?)
}
