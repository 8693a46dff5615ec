//! Overpass API query proxy.
//!
//! Accepts `POST { "query": "<Overpass QL>" }`, validates the query, and
//! forwards it to one of several public Overpass mirrors, failing over to
//! the next mirror when one errors or stalls.
//!
//! ```text
//!     client ──▶ http server ──▶ query validator ──▶ executor ──▶ mirror A
//!                                                       │   ╲
//!                                                       │    ╲──▶ mirror B
//!                                                       ▼
//!                                                health registry
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use overpass_proxy::config::{load_config, watcher::ConfigWatcher, ProxyConfig};
use overpass_proxy::http::HttpServer;
use overpass_proxy::lifecycle::{signals, Shutdown};
use overpass_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "overpass-proxy", version)]
#[command(about = "Failover proxy for Overpass API mirrors", long_about = None)]
struct Args {
    /// Path to a TOML config file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "overpass-proxy starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        path = %config.listener.path,
        endpoints = config.upstream.endpoints.len(),
        selection = ?config.upstream.selection,
        attempt_timeout_ms = config.upstream.attempt_timeout_ms,
        max_attempts = config.upstream.max_attempts,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Hot reload only when a file backs the config. The watcher must outlive the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::shutdown_on_signal(shutdown));

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
