//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use uri_router::config::RouterConfig;
use uri_router::http::HttpServer;
use uri_router::lifecycle::{Application, Shutdown};
use uri_router::routing::RouteOptions;

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<RouterConfig>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start `app` with `config` on 127.0.0.1:0.
pub async fn start_server(mut config: RouterConfig, app: Application) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let server = HttpServer::new(config, Arc::new(app)).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (config_updates, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let _ = server.run(listener, rx, server_shutdown).await;
    });

    TestServer {
        addr,
        shutdown,
        config_updates,
    }
}

/// Application with a `/ping` closure route answering `pong` to GET.
pub fn ping_app() -> Application {
    Application::new().with_routes(|routes| {
        routes.closure(
            RouteOptions::new("/ping")
                .method(axum::http::Method::GET)
                .callable(|ctx, _| ctx.response_mut().write("pong")),
        )
    })
}

/// Client without connection pooling or proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Poll `check` until it returns true or the deadline passes.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..50 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
