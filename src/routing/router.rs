//! Route registry and lookup.
//!
//! # Responsibilities
//! - Store registered routes in two partitions: static and variable
//! - Validate and normalize registrations, reject duplicate paths
//! - Resolve a request path to a route plus its bound variables
//!
//! # Design Decisions
//! - Built at startup, read-only while serving (reloads build a new registry)
//! - Static routes first: O(1) exact lookup, then a case-folded index
//! - Variable routes scanned linearly; first match in registration order wins,
//!   there is no specificity ranking
//! - Explicit `None` on no match rather than a silent default

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::Path;
use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;

use crate::dispatch::context::RequestContext;
use crate::dispatch::controller::{ControllerFactory, ControllerRegistry};
use crate::routing::components::UriComponents;
use crate::routing::matcher::PathPattern;
use crate::routing::route::{
    ClosureFn, ResourceRoots, RouteKind, RouteOptions, RouteTarget, RouteUri, Target,
};
use crate::routing::sitemap::build_sitemap;

/// Handler invoked when no route matches.
pub type NotFoundHandler = Arc<dyn Fn(&mut RequestContext) + Send + Sync>;

/// Paths registered by [`RouteRegistry::include_sitemap_routes`].
pub const SITEMAP_PATHS: [&str; 2] = ["/sitemap", "/sitemap.xml"];

/// Why a registration was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("route {path} has no target")]
    MissingTarget { path: String },

    #[error("closure route {path} was given a target that is not callable")]
    NotCallable { path: String },

    #[error("a route with path {path} is already registered")]
    Duplicate { path: String },

    #[error("variable {{{name}}} is used more than once in {path}")]
    DuplicateVariable { path: String, name: String },

    #[error("invalid HTTP method {method:?} for route {path}")]
    InvalidMethod { path: String, method: String },
}

/// A resolved request.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteUri,
    pub vars: HashMap<String, String>,
}

impl RouteMatch<'_> {
    /// Value bound to a path variable.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Coerce a redirect code to one of 301, 302, 303, 307, 308 (default 301).
pub fn redirect_status(code: u16) -> StatusCode {
    match code {
        301 | 302 | 303 | 307 | 308 => {
            StatusCode::from_u16(code).unwrap_or(StatusCode::MOVED_PERMANENTLY)
        }
        _ => StatusCode::MOVED_PERMANENTLY,
    }
}

/// The application's route table.
pub struct RouteRegistry {
    static_routes: BTreeMap<String, RouteUri>,
    /// Lower-cased path -> key, for case-insensitive static routes.
    folded: HashMap<String, String>,
    variable_routes: Vec<RouteUri>,
    base_url: String,
    roots: ResourceRoots,
    controllers: Arc<ControllerRegistry>,
    not_found: Option<NotFoundHandler>,
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RouteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRegistry")
            .field("static_routes", &self.static_routes.len())
            .field("variable_routes", &self.variable_routes.len())
            .field("base_url", &self.base_url)
            .field("roots", &self.roots)
            .finish()
    }
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::with_controllers(Arc::new(ControllerRegistry::default()))
    }

    /// Registry that resolves resource targets against `controllers`.
    pub fn with_controllers(controllers: Arc<ControllerRegistry>) -> Self {
        Self {
            static_routes: BTreeMap::new(),
            folded: HashMap::new(),
            variable_routes: Vec::new(),
            base_url: String::new(),
            roots: ResourceRoots::default(),
            controllers,
            not_found: None,
        }
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_roots(&mut self, roots: ResourceRoots) {
        self.roots = roots;
    }

    pub fn roots(&self) -> &ResourceRoots {
        &self.roots
    }

    pub fn set_not_found(&mut self, handler: NotFoundHandler) {
        self.not_found = Some(handler);
    }

    pub fn not_found(&self) -> Option<&NotFoundHandler> {
        self.not_found.as_ref()
    }

    /// Register a view route; file targets resolve under the pages root.
    pub fn view(&mut self, options: RouteOptions) -> Result<(), RegistrationError> {
        self.register(RouteKind::View, options)
    }

    /// Register an API route; file targets resolve under the APIs root.
    pub fn api(&mut self, options: RouteOptions) -> Result<(), RegistrationError> {
        self.register(RouteKind::Api, options)
    }

    /// Register a closure route. The target must be callable.
    pub fn closure(&mut self, options: RouteOptions) -> Result<(), RegistrationError> {
        self.register(RouteKind::Closure, options)
    }

    /// Register a route of any target type; file targets resolve under the
    /// application root.
    pub fn add_route(&mut self, options: RouteOptions) -> Result<(), RegistrationError> {
        self.register(RouteKind::Custom, options)
    }

    /// Register a closure route that redirects to `to`.
    pub fn redirect(&mut self, path: &str, to: &str, code: u16) -> Result<(), RegistrationError> {
        self.redirect_route(RouteOptions::new(path), to, code)
    }

    /// Like [`redirect`](Self::redirect), keeping the methods, case rule,
    /// middleware and sitemap settings of `options`. Its target is replaced.
    pub fn redirect_route(&mut self, options: RouteOptions, to: &str, code: u16) -> Result<(), RegistrationError> {
        if to.trim().is_empty() {
            return Err(RegistrationError::MissingTarget { path: options.path });
        }
        let status = redirect_status(code);
        let location = to.to_string();
        let redirect: ClosureFn = Arc::new(move |ctx: &mut RequestContext, _: &[String]| {
            ctx.response_mut().redirect(&location, status);
        });
        self.closure(RouteOptions {
            route_to: Some(RouteTarget::Callable(redirect)),
            ..options
        })
    }

    /// Register `/sitemap` and `/sitemap.xml`, both serving [`Self::sitemap`].
    pub fn include_sitemap_routes(&mut self) -> Result<(), RegistrationError> {
        for path in SITEMAP_PATHS {
            let options = RouteOptions::new(path);
            let components = UriComponents::parse(&options.path);
            let pattern = PathPattern::new(components.segments(), options.case_sensitive)
                .map_err(|dup| RegistrationError::DuplicateVariable {
                    path: path.to_string(),
                    name: dup.0,
                })?;
            let route = RouteUri::new(components, pattern, RouteKind::Closure, Target::Sitemap, options);
            self.insert(route)?;
        }
        Ok(())
    }

    fn register(&mut self, kind: RouteKind, mut options: RouteOptions) -> Result<(), RegistrationError> {
        let components = UriComponents::parse(&options.path);
        let display = components.display_path();

        let pattern = PathPattern::new(components.segments(), options.case_sensitive).map_err(|dup| {
            RegistrationError::DuplicateVariable {
                path: display.clone(),
                name: dup.0,
            }
        })?;

        let (kind, target) = match (kind, options.route_to.take()) {
            (_, None) => return Err(RegistrationError::MissingTarget { path: display }),
            (RouteKind::Closure, Some(RouteTarget::Resource(_))) => {
                return Err(RegistrationError::NotCallable { path: display });
            }
            (RouteKind::Custom, Some(RouteTarget::Callable(f))) => (RouteKind::Closure, Target::Closure(f)),
            (kind, Some(RouteTarget::Callable(f))) => (kind, Target::Closure(f)),
            (_, Some(RouteTarget::Resource(r))) if r.trim().is_empty() => {
                return Err(RegistrationError::MissingTarget { path: display });
            }
            (kind, Some(RouteTarget::Resource(r))) => (kind, self.resolve_resource(kind, r.trim())),
        };

        let route = RouteUri::new(components, pattern, kind, target, options);
        self.insert(route)
    }

    /// A resource names a controller if the registry knows it by its full
    /// name or by its file stem; anything else is a file under the kind root.
    fn resolve_resource(&self, kind: RouteKind, resource: &str) -> Target {
        let stem = Path::new(resource)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(resource);

        let found: Option<(&str, ControllerFactory)> = self
            .controllers
            .get(resource)
            .map(|f| (resource, f))
            .or_else(|| self.controllers.get(stem).map(|f| (stem, f)));

        match found {
            Some((name, factory)) => Target::Controller {
                name: name.to_string(),
                factory,
            },
            None => Target::File(self.roots.for_kind(kind).join(resource.trim_start_matches('/'))),
        }
    }

    fn insert(&mut self, route: RouteUri) -> Result<(), RegistrationError> {
        let path = route.path();
        if self.collides(&route) {
            tracing::debug!(path = %path, "Rejected duplicate route");
            return Err(RegistrationError::Duplicate { path });
        }

        tracing::debug!(
            path = %path,
            kind = %route.kind(),
            target = %route.target().describe(),
            "Route registered"
        );

        if route.is_static() {
            if !route.case_sensitive() {
                self.folded.insert(path.to_lowercase(), path.clone());
            }
            self.static_routes.insert(path, route);
        } else {
            self.variable_routes.push(route);
        }
        Ok(())
    }

    fn collides(&self, route: &RouteUri) -> bool {
        let path = route.path();
        if route.is_static() {
            if self.static_routes.contains_key(&path) {
                return true;
            }
            !route.case_sensitive() && self.static_routes.values().any(|r| route.same_path(&r.path()))
        } else {
            self.variable_routes.iter().any(|r| route.same_path(&r.path()))
        }
    }

    /// Resolve a request URI: static partition first, then the first variable
    /// route that binds.
    pub fn resolve(&self, uri: &str) -> Option<RouteMatch<'_>> {
        self.resolve_components(&UriComponents::parse(uri))
    }

    pub fn resolve_components(&self, request: &UriComponents) -> Option<RouteMatch<'_>> {
        let segments = request.segments();

        if let Some(route) = self
            .find_static(&request.display_path())
            .filter(|r| r.matches_static(segments))
        {
            return Some(RouteMatch {
                route,
                vars: HashMap::new(),
            });
        }

        self.variable_routes.iter().find_map(|route| {
            route
                .bind_variables(segments)
                .map(|vars| RouteMatch { route, vars })
        })
    }

    fn find_static(&self, path: &str) -> Option<&RouteUri> {
        self.static_routes.get(path).or_else(|| {
            self.folded
                .get(&path.to_lowercase())
                .and_then(|key| self.static_routes.get(key))
        })
    }

    /// The registered route with exactly this template path. A route stored
    /// under that exact path wins over one that only matches case-folded.
    pub fn get_route(&self, path: &str) -> Option<&RouteUri> {
        let display = UriComponents::parse(path).display_path();
        match self.static_key(&display) {
            Some(key) => self.static_routes.get(&key),
            None => self
                .variable_position(&display)
                .map(|i| &self.variable_routes[i]),
        }
    }

    /// Mutable access to a registered route, looked up like [`get_route`](Self::get_route).
    pub fn get_route_mut(&mut self, path: &str) -> Option<&mut RouteUri> {
        let display = UriComponents::parse(path).display_path();
        match self.static_key(&display) {
            Some(key) => self.static_routes.get_mut(&key),
            None => {
                let position = self.variable_position(&display)?;
                self.variable_routes.get_mut(position)
            }
        }
    }

    fn static_key(&self, display: &str) -> Option<String> {
        if self.static_routes.contains_key(display) {
            Some(display.to_string())
        } else {
            self.folded.get(&display.to_lowercase()).cloned()
        }
    }

    fn variable_position(&self, display: &str) -> Option<usize> {
        self.variable_routes
            .iter()
            .position(|r| r.path() == display)
            .or_else(|| self.variable_routes.iter().position(|r| r.same_path(display)))
    }

    pub fn has_route(&self, path: &str) -> bool {
        self.get_route(path).is_some()
    }

    /// Remove a route by its template path. Returns false if none matched.
    pub fn remove_route(&mut self, path: &str) -> bool {
        let display = UriComponents::parse(path).display_path();

        let removed = if let Some(key) = self.static_key(&display) {
            self.folded.retain(|_, v| v != &key);
            self.static_routes.remove(&key).map(|r| r.path())
        } else {
            self.variable_position(&display)
                .map(|i| self.variable_routes.remove(i).path())
        };

        match removed {
            Some(path) => {
                tracing::debug!(path = %path, "Route removed");
                true
            }
            None => false,
        }
    }

    pub fn remove_all(&mut self) {
        self.static_routes.clear();
        self.folded.clear();
        self.variable_routes.clear();
    }

    pub fn routes_count(&self) -> usize {
        self.static_routes.len() + self.variable_routes.len()
    }

    /// All routes: static ones sorted by path, then variable ones in
    /// registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RouteUri> {
        self.static_routes.values().chain(self.variable_routes.iter())
    }

    /// Full URI of every route mapped to its target description.
    pub fn routes(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|r| (format!("{}{}", self.base_url, r.path()), r.target().describe()))
            .collect()
    }

    /// Diagnostic dump, one `uri => target` line per route.
    pub fn print_routes<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        for (uri, target) in self.routes() {
            writeln!(out, "{uri} => {target}")?;
        }
        Ok(())
    }

    /// Sitemap document for all routes flagged for inclusion.
    pub fn sitemap(&self) -> String {
        build_sitemap(&self.base_url, self.iter())
    }
}
