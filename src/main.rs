//! wsgate WebSocket server.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                        WSGATE                        │
//!                      │                                                      │
//!   Upgrade request    │  ┌─────────┐    ┌───────────┐    ┌───────────────┐   │
//!   ───────────────────┼─▶│  http   │───▶│  upgrade  │───▶│    pathmap    │   │
//!                      │  │ server  │    │ container │    │ (negotiators) │   │
//!                      │  └─────────┘    └─────┬─────┘    └───────────────┘   │
//!                      │                       │ creator → endpoint            │
//!                      │                       ▼                               │
//!   WebSocket frames   │  ┌─────────┐    ┌───────────┐    ┌───────────────┐   │
//!   ◀──────────────────┼─▶│  socket │───▶│  session  │───▶│   listeners   │   │
//!                      │  │  pump   │    │ registry  │    │  (fan-out)    │   │
//!                      │  └────┬────┘    └───────────┘    └───────────────┘   │
//!                      │       │ text frames                                  │
//!                      │       ▼                                              │
//!                      │  ┌─────────┐                                         │
//!                      │  │  utf8   │  streaming validation                   │
//!                      │  └─────────┘                                         │
//!                      │                                                      │
//!                      │  config · lifecycle · observability · admin          │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use wsgate::config::{load_config, ServerConfig};
use wsgate::lifecycle::{build_container, signals, Shutdown};
use wsgate::observability::{logging, metrics};
use wsgate::HttpServer;

#[derive(Parser)]
#[command(name = "wsgate", version, about = "WebSocket server")]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "WSGATE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("wsgate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        mappings = config.mappings.len(),
        idle_timeout_secs = config.websocket.idle_timeout_secs,
        "Configuration loaded"
    );
    if config.mappings.is_empty() {
        tracing::warn!("No mappings configured, every request will be answered with 404");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to install metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let container = Arc::new(build_container(&config)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let admin_listener = if config.admin.enabled {
        Some(TcpListener::bind(&config.admin.bind_address).await?)
    } else {
        None
    };

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let grace = Duration::from_secs(config.listener.shutdown_grace_secs);
    let server = HttpServer::new(config, Arc::clone(&container));
    let mut stopped = shutdown.subscribe();

    tokio::select! {
        result = server.run(listener, admin_listener, &shutdown) => result?,
        _ = async {
            let _ = stopped.recv().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(
                open_sessions = container.open_sessions().len(),
                "Grace period elapsed, forcing exit"
            );
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
