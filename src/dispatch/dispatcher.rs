//! Request dispatch.
//!
//! # Responsibilities
//! - Redirect `www.` hosts to the bare host when configured
//! - Resolve the request against the registry (static first, then variable)
//! - Answer 404 / 405 without running middleware or targets
//! - Run `before` hooks, the target, then `after` hooks
//! - Execute the target: closure, controller, file resource or sitemap
//!
//! # Design Decisions
//! - Synchronous: a request is resolved and executed to completion
//! - Only configuration faults are returned as errors
//! - `before` hooks do not short-circuit unless explicitly enabled

use std::path::Path;
use std::sync::Arc;

use axum::http::{header, Method, StatusCode};
use serde_json::json;

use crate::dispatch::context::{RequestContext, RouterResponse};
use crate::dispatch::controller::Controller;
use crate::dispatch::error::{RoutingError, RoutingResult};
use crate::dispatch::middleware::{Middleware, MiddlewareRegistry};
use crate::routing::components::UriComponents;
use crate::routing::route::{RouteUri, Target};
use crate::routing::router::RouteRegistry;

/// Dispatch behavior switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// 301 from `www.host` to `host` before routing.
    pub redirect_to_non_www: bool,
    /// Answer a starter page while no routes are registered.
    pub starter_page: bool,
    /// Unmatched requests under this prefix get JSON 404 bodies.
    pub api_prefix: String,
    /// Stop the chain when a `before` hook terminates the response.
    pub short_circuit: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            redirect_to_non_www: false,
            starter_page: true,
            api_prefix: "/apis".to_string(),
            short_circuit: false,
        }
    }
}

/// Routes plus middleware, ready to serve requests.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    routes: Arc<RouteRegistry>,
    middleware: Arc<MiddlewareRegistry>,
    settings: DispatchSettings,
    /// Normalized `api_prefix`; `None` when it is empty or `/`.
    api_prefix: Option<String>,
}

impl Dispatcher {
    pub fn new(routes: RouteRegistry, middleware: MiddlewareRegistry, settings: DispatchSettings) -> Self {
        let prefix = UriComponents::parse(&settings.api_prefix).display_path();
        let api_prefix = (!settings.api_prefix.trim().is_empty() && prefix != "/").then_some(prefix);
        Self {
            routes: Arc::new(routes),
            middleware: Arc::new(middleware),
            settings,
            api_prefix,
        }
    }

    pub fn routes(&self) -> &RouteRegistry {
        &self.routes
    }

    pub fn middleware(&self) -> &MiddlewareRegistry {
        &self.middleware
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Dispatch a request with no headers.
    pub fn route(&self, method: Method, uri: &str) -> RoutingResult<RouterResponse> {
        self.dispatch(RequestContext::new(method, uri))
    }

    pub fn dispatch(&self, mut ctx: RequestContext) -> RoutingResult<RouterResponse> {
        if self.settings.redirect_to_non_www {
            if let Some(location) = ctx.uri().without_www() {
                tracing::debug!(location = %location, "Redirecting to non-www host");
                ctx.response_mut().redirect(&location, StatusCode::MOVED_PERMANENTLY);
                return Ok(ctx.into_response());
            }
        }

        if self.routes.routes_count() == 0 {
            if self.settings.starter_page {
                starter_page(ctx.response_mut());
            } else {
                self.not_found(&mut ctx);
            }
            return Ok(ctx.into_response());
        }

        let request = ctx.uri().clone();
        let Some(matched) = self.routes.resolve_components(&request) else {
            ctx.set_api(self.is_api_path(&request));
            tracing::debug!(path = %request.display_path(), method = %ctx.method(), "No route matched");
            self.not_found(&mut ctx);
            return Ok(ctx.into_response());
        };

        let route = matched.route;
        ctx.bind(route.path(), matched.vars, route.is_api());

        if !route.is_method_allowed(ctx.method()) {
            tracing::debug!(route = %route.path(), method = %ctx.method(), "Method not allowed");
            method_not_allowed(&mut ctx, route.allowed_methods());
            return Ok(ctx.into_response());
        }

        let chain = self.middleware.resolve(route.middleware());
        tracing::debug!(
            route = %route.path(),
            kind = %route.kind(),
            middleware = chain.len(),
            "Dispatching"
        );
        self.run_chain(route, &chain, &mut ctx)?;
        Ok(ctx.into_response())
    }

    fn run_chain(
        &self,
        route: &RouteUri,
        chain: &[Arc<dyn Middleware>],
        ctx: &mut RequestContext,
    ) -> RoutingResult<()> {
        for middleware in chain {
            middleware.before(ctx);
            if self.settings.short_circuit && ctx.response().is_terminated() {
                tracing::debug!(middleware = %middleware.name(), "Request terminated by middleware");
                return Ok(());
            }
        }

        self.execute(route, ctx)?;

        for middleware in chain {
            middleware.after(ctx);
        }
        Ok(())
    }

    fn execute(&self, route: &RouteUri, ctx: &mut RequestContext) -> RoutingResult<()> {
        match route.target() {
            Target::Closure(f) => f(ctx, route.closure_params()),
            Target::Sitemap => ctx.response_mut().xml(self.routes.sitemap()),
            Target::Controller { name, factory } => run_controller(factory(), name, route, ctx)?,
            Target::File(path) => serve_file(route, path, ctx)?,
        }
        Ok(())
    }

    fn not_found(&self, ctx: &mut RequestContext) {
        ctx.response_mut().set_status(StatusCode::NOT_FOUND);
        match self.routes.not_found() {
            Some(handler) => handler(ctx),
            None => default_not_found(ctx),
        }
    }

    fn is_api_path(&self, request: &UriComponents) -> bool {
        let Some(prefix) = &self.api_prefix else {
            return false;
        };
        let path = request.display_path();
        path == *prefix || path.strip_prefix(prefix.as_str()).is_some_and(|rest| rest.starts_with('/'))
    }
}

fn run_controller(
    controller: Controller,
    name: &str,
    route: &RouteUri,
    ctx: &mut RequestContext,
) -> RoutingResult<()> {
    match controller {
        Controller::Service(mut service) => service.process(ctx),
        Controller::Page(mut page) => page.render(ctx),
        Controller::Actions(mut actions) => {
            if let Some(action) = route.action() {
                if !actions.call_action(action, ctx) {
                    return Err(RoutingError::UnknownAction {
                        route: route.path(),
                        controller: name.to_string(),
                        action: action.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn serve_file(route: &RouteUri, path: &Path, ctx: &mut RequestContext) -> RoutingResult<()> {
    if !path.is_file() {
        return Err(RoutingError::MissingResource {
            route: route.path(),
            path: path.to_path_buf(),
        });
    }

    let body = std::fs::read(path).map_err(|source| RoutingError::Io {
        route: route.path(),
        path: path.to_path_buf(),
        source,
    })?;

    let (content_type, text) = content_type(path);
    let response = ctx.response_mut();
    response.set_header(header::CONTENT_TYPE, content_type);
    if !text {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        response.set_header(
            header::CONTENT_DISPOSITION,
            &format!("inline; filename=\"{file_name}\""),
        );
    }
    response.set_body(body);
    Ok(())
}

/// Content type of a file resource and whether it is served as text.
fn content_type(path: &Path) -> (&'static str, bool) {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => ("text/html; charset=UTF-8", true),
        "txt" => ("text/plain; charset=UTF-8", true),
        "css" => ("text/css", true),
        "js" | "mjs" => ("application/javascript", true),
        "json" => ("application/json", true),
        "xml" => ("text/xml", true),
        "svg" => ("image/svg+xml", true),
        "md" => ("text/markdown", true),
        "csv" => ("text/csv", true),
        "png" => ("image/png", false),
        "jpg" | "jpeg" => ("image/jpeg", false),
        "gif" => ("image/gif", false),
        "webp" => ("image/webp", false),
        "ico" => ("image/x-icon", false),
        "pdf" => ("application/pdf", false),
        "woff2" => ("font/woff2", false),
        "mp4" => ("video/mp4", false),
        _ => ("application/octet-stream", false),
    }
}

/// 404 response: JSON in API context, an HTML page otherwise.
pub fn default_not_found(ctx: &mut RequestContext) {
    let api = ctx.is_api();
    let response = ctx.response_mut();
    if api {
        response.json(StatusCode::NOT_FOUND, &error_body("Requested resource was not found.", StatusCode::NOT_FOUND));
    } else {
        response.html(StatusCode::NOT_FOUND, error_page(StatusCode::NOT_FOUND, "The requested page was not found."));
    }
}

fn method_not_allowed(ctx: &mut RequestContext, allowed: &[Method]) {
    let api = ctx.is_api();
    let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
    let response = ctx.response_mut();
    if api {
        response.json(StatusCode::METHOD_NOT_ALLOWED, &error_body("Method Not Allowed.", StatusCode::METHOD_NOT_ALLOWED));
    } else {
        response.html(
            StatusCode::METHOD_NOT_ALLOWED,
            error_page(StatusCode::METHOD_NOT_ALLOWED, "The request method is not allowed for this page."),
        );
    }
    response.set_header(header::ALLOW, &allow);
}

fn error_body(message: &str, status: StatusCode) -> serde_json::Value {
    json!({
        "message": message,
        "type": "error",
        "http-code": status.as_u16(),
    })
}

fn error_page(status: StatusCode, message: &str) -> String {
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    format!(
        "<!DOCTYPE html>\n<html><head><title>{title}</title></head>\
         <body><h1>{title}</h1><p>{message}</p></body></html>\n"
    )
}

fn starter_page(response: &mut RouterResponse) {
    response.html(
        StatusCode::OK,
        "<!DOCTYPE html>\n<html><head><title>It works</title></head>\
         <body><h1>It works</h1><p>No routes are registered yet. \
         Add routes to the configuration file or register them at startup.</p></body></html>\n",
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::controller::{ActionController, ControllerRegistry, Page, WebService};
    use crate::dispatch::middleware::{FnMiddleware, GLOBAL_GROUP};
    use crate::routing::route::{ResourceRoots, RouteOptions};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn dispatcher(routes: RouteRegistry) -> Dispatcher {
        Dispatcher::new(routes, MiddlewareRegistry::new(), DispatchSettings::default())
    }

    fn ping() -> RouteOptions {
        RouteOptions::new("/ping").callable(|ctx, _| ctx.response_mut().write("pong"))
    }

    #[test]
    fn test_closure_route() {
        let mut routes = RouteRegistry::new();
        routes.closure(ping()).unwrap();
        let res = dispatcher(routes).route(Method::GET, "/ping").unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body_text(), "pong");
    }

    #[test]
    fn test_closure_params() {
        let mut routes = RouteRegistry::new();
        routes
            .closure(
                RouteOptions::new("/greet/{name}")
                    .closure_params(["Hello", "!"])
                    .callable(|ctx, args| {
                        let name = ctx.var("name").unwrap_or_default().to_string();
                        ctx.response_mut().write(format!("{} {name}{}", args[0], args[1]));
                    }),
            )
            .unwrap();
        let res = dispatcher(routes).route(Method::GET, "/greet/Ann").unwrap();
        assert_eq!(res.body_text(), "Hello Ann!");
    }

    #[test]
    fn test_method_gating_skips_target_and_middleware() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut routes = RouteRegistry::new();
        let c = calls.clone();
        routes
            .closure(RouteOptions::new("/only-get").method(Method::GET).callable(move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        let mut middleware = MiddlewareRegistry::new();
        let m = calls.clone();
        middleware.register_in(
            Arc::new(FnMiddleware::new("count", move |_| {
                m.fetch_add(1, Ordering::SeqCst);
            })),
            &[GLOBAL_GROUP],
        );

        let d = Dispatcher::new(routes, middleware, DispatchSettings::default());
        let res = d.route(Method::POST, "/only-get").unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.header(&header::ALLOW), Some("GET"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        d.route(Method::GET, "/only-get").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_method_not_allowed_is_json_for_api_routes() {
        let mut routes = RouteRegistry::new();
        routes
            .api(RouteOptions::new("/apis/users").method(Method::GET).callable(|_, _| {}))
            .unwrap();
        let res = dispatcher(routes).route(Method::DELETE, "/apis/users").unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.header(&header::CONTENT_TYPE), Some("application/json"));
        assert!(res.body_text().contains("\"http-code\":405"));
    }

    #[test]
    fn test_not_found() {
        let mut routes = RouteRegistry::new();
        routes.closure(ping()).unwrap();
        let d = dispatcher(routes);

        let res = d.route(Method::GET, "/nope").unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.header(&header::CONTENT_TYPE).unwrap().starts_with("text/html"));

        let res = d.route(Method::GET, "/apis/nope").unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.header(&header::CONTENT_TYPE), Some("application/json"));
    }

    #[test]
    fn test_api_prefix_is_normalized() {
        let with_prefix = |prefix: &str| {
            let mut routes = RouteRegistry::new();
            routes.closure(ping()).unwrap();
            let settings = DispatchSettings {
                api_prefix: prefix.to_string(),
                ..DispatchSettings::default()
            };
            Dispatcher::new(routes, MiddlewareRegistry::new(), settings)
        };
        let content_type = |d: &Dispatcher, path: &str| {
            let res = d.route(Method::GET, path).unwrap();
            res.header(&header::CONTENT_TYPE).unwrap_or_default().to_string()
        };

        let d = with_prefix("api/");
        assert_eq!(content_type(&d, "/api"), "application/json");
        assert_eq!(content_type(&d, "/api/users/"), "application/json");
        assert!(content_type(&d, "/apiary").starts_with("text/html"));

        for prefix in ["", "/"] {
            let d = with_prefix(prefix);
            assert!(content_type(&d, "/api/users").starts_with("text/html"));
        }
    }

    #[test]
    fn test_custom_not_found() {
        let mut routes = RouteRegistry::new();
        routes.closure(ping()).unwrap();
        routes.set_not_found(Arc::new(|ctx: &mut RequestContext| ctx.response_mut().write("gone")));
        let res = dispatcher(routes).route(Method::GET, "/x").unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.body_text(), "gone");
    }

    #[test]
    fn test_empty_registry() {
        let res = dispatcher(RouteRegistry::new()).route(Method::GET, "/anything").unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.body_text().contains("It works"));

        let settings = DispatchSettings {
            starter_page: false,
            ..DispatchSettings::default()
        };
        let d = Dispatcher::new(RouteRegistry::new(), MiddlewareRegistry::new(), settings);
        assert_eq!(d.route(Method::GET, "/").unwrap().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_redirect_code_coerced() {
        let mut routes = RouteRegistry::new();
        routes.redirect("/old", "/new", 999).unwrap();
        routes.redirect("/tmp", "/new", 307).unwrap();
        let d = dispatcher(routes);

        let res = d.route(Method::GET, "/old").unwrap();
        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(res.header(&header::LOCATION), Some("/new"));
        assert_eq!(d.route(Method::GET, "/tmp").unwrap().status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[test]
    fn test_non_www_redirect() {
        let mut routes = RouteRegistry::new();
        routes.closure(ping()).unwrap();
        let settings = DispatchSettings {
            redirect_to_non_www: true,
            ..DispatchSettings::default()
        };
        let d = Dispatcher::new(routes, MiddlewareRegistry::new(), settings);

        let res = d.route(Method::GET, "https://www.example.com/ping?x=1").unwrap();
        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(res.header(&header::LOCATION), Some("https://example.com/ping?x=1"));

        let res = d.route(Method::GET, "https://example.com/ping").unwrap();
        assert_eq!(res.body_text(), "pong");
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str, priority: i32, terminate: bool) -> Arc<dyn Middleware> {
        let before_log = log.clone();
        let after_log = log.clone();
        Arc::new(
            FnMiddleware::new(name, move |ctx| {
                before_log.lock().unwrap().push(format!("before:{name}"));
                if terminate {
                    ctx.response_mut().set_status(StatusCode::UNAUTHORIZED);
                    ctx.response_mut().terminate();
                }
            })
            .with_after(move |_| after_log.lock().unwrap().push(format!("after:{name}")))
            .with_priority(priority),
        )
    }

    fn chain_setup(short_circuit: bool) -> (Dispatcher, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut middleware = MiddlewareRegistry::new();
        middleware.register_in(recorder(&log, "late", 10, false), &[GLOBAL_GROUP]);
        middleware.register(recorder(&log, "auth", 1, true));
        middleware.register(recorder(&log, "first", 1, false));

        let target_log = log.clone();
        let mut routes = RouteRegistry::new();
        routes
            .closure(
                RouteOptions::new("/secure")
                    .middleware("first")
                    .middleware("auth")
                    .callable(move |_, _| target_log.lock().unwrap().push("target".into())),
            )
            .unwrap();

        let settings = DispatchSettings {
            short_circuit,
            ..DispatchSettings::default()
        };
        (Dispatcher::new(routes, middleware, settings), log)
    }

    #[test]
    fn test_middleware_order_without_short_circuit() {
        let (d, log) = chain_setup(false);
        let res = d.route(Method::GET, "/secure").unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            *log.lock().unwrap(),
            [
                "before:first", "before:auth", "before:late", "target",
                "after:first", "after:auth", "after:late",
            ]
        );
    }

    #[test]
    fn test_middleware_short_circuit() {
        let (d, log) = chain_setup(true);
        let res = d.route(Method::GET, "/secure").unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(*log.lock().unwrap(), ["before:first", "before:auth"]);
    }

    #[derive(Default)]
    struct Service;
    impl WebService for Service {
        fn process(&mut self, ctx: &mut RequestContext) {
            let body = format!("service {}", ctx.method());
            ctx.response_mut().write(body);
        }
    }

    #[derive(Default)]
    struct Home;
    impl Page for Home {
        fn render(&mut self, ctx: &mut RequestContext) {
            ctx.response_mut().html(StatusCode::OK, "<h1>home</h1>");
        }
    }

    #[derive(Default)]
    struct Users;
    impl ActionController for Users {
        fn call_action(&mut self, action: &str, ctx: &mut RequestContext) -> bool {
            if action == "show" {
                let id = ctx.var("id").unwrap_or_default().to_string();
                ctx.response_mut().write(format!("user {id}"));
                true
            } else {
                false
            }
        }
    }

    #[test]
    fn test_controller_targets() {
        let mut controllers = ControllerRegistry::new();
        controllers.register_service::<Service>("Service");
        controllers.register_page::<Home>("Home");
        controllers.register_actions::<Users>("Users");
        let mut routes = RouteRegistry::with_controllers(Arc::new(controllers));
        routes.api(RouteOptions::new("/apis/service").route_to("Service")).unwrap();
        routes.view(RouteOptions::new("/").route_to("Home")).unwrap();
        routes.add_route(RouteOptions::new("/users/{id}").route_to("Users").action("show")).unwrap();
        routes.add_route(RouteOptions::new("/users/{id}/purge").route_to("Users").action("purge")).unwrap();
        let d = dispatcher(routes);

        assert_eq!(d.route(Method::PUT, "/apis/service").unwrap().body_text(), "service PUT");
        assert_eq!(d.route(Method::GET, "/").unwrap().body_text(), "<h1>home</h1>");
        assert_eq!(d.route(Method::GET, "/users/7").unwrap().body_text(), "user 7");
        assert!(matches!(
            d.route(Method::GET, "/users/7/purge"),
            Err(RoutingError::UnknownAction { .. })
        ));
    }

    #[test]
    fn test_file_targets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pages")).unwrap();
        std::fs::write(dir.path().join("pages/about.html"), "<p>about</p>").unwrap();
        std::fs::write(dir.path().join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();

        let mut routes = RouteRegistry::new();
        routes.set_roots(ResourceRoots::new(dir.path(), "apis", "pages"));
        routes.view(RouteOptions::new("/about").route_to("about.html")).unwrap();
        routes.add_route(RouteOptions::new("/logo").route_to("logo.png")).unwrap();
        routes.view(RouteOptions::new("/missing").route_to("missing.html")).unwrap();
        let d = dispatcher(routes);

        let res = d.route(Method::GET, "/about").unwrap();
        assert_eq!(res.body_text(), "<p>about</p>");
        assert_eq!(res.header(&header::CONTENT_TYPE), Some("text/html; charset=UTF-8"));

        let res = d.route(Method::GET, "/logo").unwrap();
        assert_eq!(res.header(&header::CONTENT_TYPE), Some("image/png"));
        assert_eq!(res.header(&header::CONTENT_DISPOSITION), Some("inline; filename=\"logo.png\""));
        assert_eq!(res.body(), [0x89, b'P', b'N', b'G']);

        match d.route(Method::GET, "/missing") {
            Err(RoutingError::MissingResource { route, path }) => {
                assert_eq!(route, "/missing");
                assert!(path.ends_with("pages/missing.html"));
            }
            other => panic!("expected configuration fault, got {other:?}"),
        }
    }

    #[test]
    fn test_sitemap_route() {
        let mut routes = RouteRegistry::new();
        routes.set_base_url("https://example.com");
        routes.include_sitemap_routes().unwrap();
        routes
            .view(RouteOptions::new("/about").route_to("about.html").in_sitemap(true))
            .unwrap();
        let d = dispatcher(routes);

        for path in ["/sitemap", "/sitemap.xml"] {
            let res = d.route(Method::GET, path).unwrap();
            assert_eq!(res.header(&header::CONTENT_TYPE), Some("text/xml"));
            assert!(res.body_text().contains("<loc>https://example.com/about</loc>"));
        }
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type(Path::new("a.HTML")), ("text/html; charset=UTF-8", true));
        assert_eq!(content_type(Path::new("a.bin")), ("application/octet-stream", false));
        assert_eq!(content_type(Path::new("noext")), ("application/octet-stream", false));
    }
}
