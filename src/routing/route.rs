//! Registered routes.
//!
//! A [`RouteUri`] is one registered path template plus everything the
//! dispatcher needs to run it: the resolved [`Target`], allowed methods, case
//! sensitivity, middleware names and the sitemap metadata.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::Method;
use serde::{Deserialize, Serialize};

use crate::dispatch::context::RequestContext;
use crate::dispatch::controller::ControllerFactory;
use crate::dispatch::middleware::GLOBAL_GROUP;
use crate::routing::components::UriComponents;
use crate::routing::matcher::PathPattern;
use crate::routing::sitemap::Expansion;

/// Callable route target. Receives the request context and the route's
/// closure parameters.
pub type ClosureFn = Arc<dyn Fn(&mut RequestContext, &[String]) + Send + Sync>;

/// How a route's target is loaded and which root a file target resolves under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    View,
    Api,
    Closure,
    Custom,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteKind::View => "view",
            RouteKind::Api => "api",
            RouteKind::Closure => "closure",
            RouteKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// What the caller asked a route to point at.
#[derive(Clone)]
pub enum RouteTarget {
    Callable(ClosureFn),
    /// File path or controller name.
    Resource(String),
}

impl fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTarget::Callable(_) => f.write_str("Callable(..)"),
            RouteTarget::Resource(r) => f.debug_tuple("Resource").field(r).finish(),
        }
    }
}

impl From<&str> for RouteTarget {
    fn from(value: &str) -> Self {
        RouteTarget::Resource(value.to_string())
    }
}

impl From<String> for RouteTarget {
    fn from(value: String) -> Self {
        RouteTarget::Resource(value)
    }
}

/// Resolved route target, decided once at registration.
#[derive(Clone)]
pub enum Target {
    Closure(ClosureFn),
    Controller {
        name: String,
        factory: ControllerFactory,
    },
    /// Absolute or root-relative path of a file resource.
    File(PathBuf),
    /// Built-in sitemap document.
    Sitemap,
}

impl Target {
    /// Description used by route listings: file targets print their path,
    /// callables print `object`.
    pub fn describe(&self) -> String {
        match self {
            Target::Closure(_) | Target::Sitemap => "object".to_string(),
            Target::Controller { name, .. } => name.clone(),
            Target::File(path) => path.display().to_string(),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Closure(_) => f.write_str("Closure(..)"),
            Target::Controller { name, .. } => f.debug_struct("Controller").field("name", name).finish(),
            Target::File(path) => f.debug_tuple("File").field(path).finish(),
            Target::Sitemap => f.write_str("Sitemap"),
        }
    }
}

/// Directories file targets are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRoots {
    pub app_root: PathBuf,
    pub apis: PathBuf,
    pub pages: PathBuf,
}

impl ResourceRoots {
    pub fn new(app_root: impl Into<PathBuf>, apis_dir: impl AsRef<Path>, pages_dir: impl AsRef<Path>) -> Self {
        let app_root = app_root.into();
        Self {
            apis: app_root.join(apis_dir),
            pages: app_root.join(pages_dir),
            app_root,
        }
    }

    pub fn for_kind(&self, kind: RouteKind) -> &Path {
        match kind {
            RouteKind::Api => &self.apis,
            RouteKind::View => &self.pages,
            RouteKind::Closure | RouteKind::Custom => &self.app_root,
        }
    }
}

impl Default for ResourceRoots {
    fn default() -> Self {
        Self::new(".", "apis", "pages")
    }
}

/// Registration options for one route.
#[derive(Debug, Clone)]
pub struct RouteOptions {
    pub path: String,
    pub route_to: Option<RouteTarget>,
    /// Empty means any method.
    pub methods: Vec<Method>,
    pub case_sensitive: bool,
    pub middleware: Vec<String>,
    pub in_sitemap: bool,
    pub languages: Vec<String>,
    pub vars_values: HashMap<String, Vec<String>>,
    pub closure_params: Vec<String>,
    pub action: Option<String>,
    pub as_api: bool,
}

impl RouteOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            route_to: None,
            methods: Vec::new(),
            case_sensitive: true,
            middleware: Vec::new(),
            in_sitemap: false,
            languages: Vec::new(),
            vars_values: HashMap::new(),
            closure_params: Vec::new(),
            action: None,
            as_api: false,
        }
    }

    pub fn route_to(mut self, target: impl Into<RouteTarget>) -> Self {
        self.route_to = Some(target.into());
        self
    }

    pub fn callable<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut RequestContext, &[String]) + Send + Sync + 'static,
    {
        self.route_to = Some(RouteTarget::Callable(Arc::new(f)));
        self
    }

    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn middleware(mut self, name: impl Into<String>) -> Self {
        self.middleware.push(name.into());
        self
    }

    pub fn in_sitemap(mut self, in_sitemap: bool) -> Self {
        self.in_sitemap = in_sitemap;
        self
    }

    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn var_values<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vars_values
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn closure_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.closure_params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn as_api(mut self, as_api: bool) -> Self {
        self.as_api = as_api;
        self
    }
}

/// One registered route.
#[derive(Debug, Clone)]
pub struct RouteUri {
    components: UriComponents,
    pattern: PathPattern,
    kind: RouteKind,
    target: Target,
    methods: Vec<Method>,
    middleware: Vec<String>,
    languages: Vec<String>,
    vars_values: HashMap<String, Vec<String>>,
    in_sitemap: bool,
    action: Option<String>,
    closure_params: Vec<String>,
    as_api: bool,
}

impl RouteUri {
    /// Assemble a route from already validated parts.
    pub(crate) fn new(
        components: UriComponents,
        pattern: PathPattern,
        kind: RouteKind,
        target: Target,
        options: RouteOptions,
    ) -> Self {
        let mut middleware = vec![GLOBAL_GROUP.to_string()];
        for name in options.middleware {
            if !middleware.contains(&name) {
                middleware.push(name);
            }
        }

        Self {
            components,
            pattern,
            kind,
            target,
            methods: options.methods,
            middleware,
            languages: options.languages,
            vars_values: options.vars_values,
            in_sitemap: options.in_sitemap,
            action: options.action,
            closure_params: options.closure_params,
            as_api: options.as_api,
        }
    }

    /// Decoded template path, e.g. `/users/{id}`.
    pub fn path(&self) -> String {
        self.components.display_path()
    }

    pub fn components(&self) -> &UriComponents {
        &self.components
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn allowed_methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn is_method_allowed(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    pub fn case_sensitive(&self) -> bool {
        self.pattern.case_sensitive()
    }

    /// Middleware and group names, `global` first.
    pub fn middleware(&self) -> &[String] {
        &self.middleware
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn in_sitemap(&self) -> bool {
        self.in_sitemap
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn closure_params(&self) -> &[String] {
        &self.closure_params
    }

    /// API routes answer errors with JSON bodies.
    pub fn is_api(&self) -> bool {
        self.as_api || self.kind == RouteKind::Api
    }

    pub fn is_static(&self) -> bool {
        self.pattern.is_static()
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.pattern.variable_names()
    }

    /// Sitemap example values for a variable.
    pub fn var_values(&self, name: &str) -> &[String] {
        self.vars_values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Extend a variable's sitemap example values.
    pub fn add_var_values<I, S>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vars_values
            .entry(name.to_string())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    pub fn matches_static<S: AsRef<str>>(&self, request: &[S]) -> bool {
        self.pattern.matches_static(request)
    }

    pub fn bind_variables<S: AsRef<str>>(&self, request: &[S]) -> Option<HashMap<String, String>> {
        self.pattern.bind_variables(request)
    }

    /// Expanded sitemap paths: the literal path for static routes, the full
    /// Cartesian product of variable example values otherwise.
    pub fn sitemap_entries(&self) -> Vec<String> {
        Expansion::new(self).collect()
    }

    /// True if `other` names the same path under this route's case rule.
    pub(crate) fn same_path(&self, other: &str) -> bool {
        let own = self.path();
        if self.case_sensitive() {
            own == other
        } else {
            own.to_lowercase() == other.to_lowercase()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str, options: RouteOptions) -> RouteUri {
        let components = UriComponents::parse(path);
        let pattern = PathPattern::new(components.segments(), options.case_sensitive).unwrap();
        RouteUri::new(components, pattern, RouteKind::View, Target::File("x.html".into()), options)
    }

    #[test]
    fn test_defaults() {
        let options = RouteOptions::new("/a");
        assert!(options.case_sensitive);
        assert!(!options.in_sitemap);
        assert!(options.methods.is_empty());

        let r = route("/a/", options);
        assert_eq!(r.path(), "/a");
        assert_eq!(r.middleware(), ["global"]);
        assert!(r.is_method_allowed(&Method::DELETE));
        assert!(!r.is_api());
    }

    #[test]
    fn test_method_gating() {
        let r = route("/a", RouteOptions::new("/a").method(Method::GET));
        assert!(r.is_method_allowed(&Method::GET));
        assert!(!r.is_method_allowed(&Method::POST));
    }

    #[test]
    fn test_middleware_always_starts_with_global() {
        let r = route(
            "/a",
            RouteOptions::new("/a").middleware("auth").middleware("global").middleware("auth"),
        );
        assert_eq!(r.middleware(), ["global", "auth"]);
    }

    #[test]
    fn test_resource_roots() {
        let roots = ResourceRoots::new("/srv/app", "apis", "pages");
        assert_eq!(roots.for_kind(RouteKind::Api), Path::new("/srv/app/apis"));
        assert_eq!(roots.for_kind(RouteKind::View), Path::new("/srv/app/pages"));
        assert_eq!(roots.for_kind(RouteKind::Custom), Path::new("/srv/app"));
    }

    #[test]
    fn test_add_var_values() {
        let mut r = route("/shop/{cat}", RouteOptions::new("/shop/{cat}").var_values("cat", ["a"]));
        r.add_var_values("cat", ["b"]);
        assert_eq!(r.var_values("cat"), ["a", "b"]);
        assert!(r.var_values("missing").is_empty());
    }
}
