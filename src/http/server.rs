//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router whose fallback feeds every request to the
//!   current [`Dispatcher`]
//! - Wire up middleware (request id, tracing, timeout, body limit)
//! - Mount the admin API when enabled
//! - Apply config reloads by swapping in a freshly built dispatcher
//!
//! # Design Decisions
//! - Dispatch runs on the blocking pool: targets may read files
//! - The body is read in full before dispatch, bounded by
//!   `security.max_body_size`; an oversized body is answered with 413
//! - Listener-level settings (timeout, body limit, admin mount) are fixed at
//!   startup; reloads replace routes, middleware and routing settings
//! - A failed reload keeps the running dispatcher

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::schema::RouterConfig;
use crate::dispatch::context::RequestContext;
use crate::dispatch::dispatcher::Dispatcher;
use crate::http::request::request_target;
use crate::http::response::internal_error;
use crate::lifecycle::startup::{Application, StartupError};
use crate::observability::metrics;
use crate::observability::tracing::request_span;

/// Config plus the dispatcher built from it; swapped as one unit.
pub struct ServerInner {
    pub config: RouterConfig,
    pub dispatcher: Dispatcher,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<ServerInner>>,
    app: Arc<Application>,
}

impl AppState {
    pub fn new(config: RouterConfig, app: Arc<Application>) -> Result<Self, StartupError> {
        let dispatcher = app.build(&config)?;
        metrics::record_routes(dispatcher.routes().routes_count());
        Ok(Self {
            inner: Arc::new(ArcSwap::from_pointee(ServerInner { config, dispatcher })),
            app,
        })
    }

    pub fn current(&self) -> Arc<ServerInner> {
        self.inner.load_full()
    }

    /// Build a dispatcher for `config` and make it live.
    pub fn reload(&self, config: RouterConfig) -> Result<(), StartupError> {
        let dispatcher = match self.app.build(&config) {
            Ok(dispatcher) => dispatcher,
            Err(e) => {
                metrics::record_reload(false);
                return Err(e);
            }
        };
        let routes = dispatcher.routes().routes_count();
        self.inner.store(Arc::new(ServerInner { config, dispatcher }));
        metrics::record_reload(true);
        metrics::record_routes(routes);
        tracing::info!(routes, "Configuration reloaded");
        Ok(())
    }
}

/// HTTP server for the router.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Build the dispatcher for `config` and the axum router around it.
    pub fn new(config: RouterConfig, app: Arc<Application>) -> Result<Self, StartupError> {
        let router_config = config.clone();
        let state = AppState::new(config, app)?;
        let router = Self::build_router(&router_config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RouterConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .fallback(dispatch_handler)
            .with_state(state.clone());

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state));
        }

        router
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires, applying config updates as
    /// they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RouterConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.state.current().dispatcher.routes().routes_count(),
            "HTTP server starting"
        );

        let state = self.state.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if let Err(e) = state.reload(config) {
                    tracing::error!(error = %e, "Reload rejected. Keeping current routes.");
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Fallback handler: every request not claimed by the admin API.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let inner = state.current();
    let method = request.method().clone();
    let target = request_target(&request);
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            let status = StatusCode::PAYLOAD_TOO_LARGE;
            metrics::record_request(method.as_str(), status.as_u16(), start);
            return status.into_response();
        }
    };

    let ctx = RequestContext::new(method.clone(), &target)
        .with_headers(parts.headers)
        .with_body(body);
    let span = tracing::Span::current();
    let worker = inner.clone();
    let result = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        worker.dispatcher.dispatch(ctx)
    })
    .await;

    let response = match result {
        Ok(Ok(response)) => response.into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Route configuration fault");
            let api = inner
                .dispatcher
                .routes()
                .resolve(&target)
                .is_some_and(|m| m.route.is_api());
            internal_error(api)
        }
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            internal_error(false)
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}
