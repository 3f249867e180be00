//! Edge proxy binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                      EDGE PROXY                      │
//!   Client Request        │  ┌────────────┐   ┌──────────┐   ┌────────────────┐  │
//!   ──────────────────────┼─▶│ request id │──▶│   CORS   │──▶│ endpoint table │  │
//!                         │  │  + trace   │   │preflight │   │   (routing)    │  │
//!                         │  └────────────┘   └──────────┘   └───────┬────────┘  │
//!                         │                                          ▼           │
//!                         │           ┌──────────────┐      ┌────────────────┐   │
//!                         │           │ email side   │◀─────│   handlers     │   │
//!                         │           │   channel    │      │ validate/enrich│   │
//!                         │           └──────────────┘      └───────┬────────┘   │
//!                         │                                          ▼           │
//!   Client Response       │                                 ┌────────────────┐   │
//!   ◀─────────────────────┼─────────────────────────────────│   forwarder    │◀──┼── Upstreams
//!                         │                                 │ordered fallback│   │   (in order)
//!                         │                                 └────────────────┘   │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_proxy::config::{load_config, load_from_env, watcher::ConfigWatcher};
use edge_proxy::lifecycle::signals;
use edge_proxy::observability::{logging, metrics};
use edge_proxy::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "edge-proxy", version, about = "Edge request proxy with CORS normalization and upstream fallback")]
struct Cli {
    /// Path to the TOML configuration file. Without it, defaults plus
    /// EDGE_PROXY_* variables are used.
    #[arg(short, long, env = "EDGE_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Reload the configuration file when it changes.
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstreams = config.upstreams.len(),
        routes = config.routes.len(),
        upstream_timeout_secs = config.timeouts.upstream_secs,
        email = config.email.enabled,
        offline_fallbacks = config.offline.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        (None, true) => {
            tracing::warn!("--watch needs --config; hot reload disabled");
            (None, mpsc::unbounded_channel().1)
        }
        _ => (None, mpsc::unbounded_channel().1),
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::listen(shutdown));

    HttpServer::new(config)
        .run(listener, config_updates, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
