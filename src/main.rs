//! URI router server.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ admin API (/admin/*, optional)
//!                          │
//!                          ▼
//!                     Dispatcher ──▶ RouteRegistry (static, then variable)
//!                          │
//!                          ▼
//!                  middleware before ─▶ target ─▶ middleware after
//!                                         │
//!                         closure | controller | file | sitemap
//!
//!     router.toml ──▶ watcher ──▶ Application::build ──▶ atomic swap
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use uri_router::config::watcher::ConfigWatcher;
use uri_router::http::HttpServer;
use uri_router::lifecycle::startup::{load_or_default, Application};
use uri_router::lifecycle::Shutdown;
use uri_router::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "uri-router")]
#[command(about = "URI routing and dispatch server", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "router.toml")]
    config: PathBuf,

    /// Do not reload when the configuration file changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(&args.config)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "uri-router starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.listener.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let app = Application::new();

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, Arc::new(app))?;

    // Keep the watcher alive for the lifetime of the server.
    let (config_updates, _watcher) = if args.no_watch || !args.config.exists() {
        let (_, rx) = mpsc::unbounded_channel();
        (rx, None)
    } else {
        let (watcher, rx) = ConfigWatcher::new(&args.config);
        (rx, Some(watcher.run()?))
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(shutdown.clone().trigger_on_signal());

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
