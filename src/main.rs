//! Adaptive request gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                  GATEWAY                         │
//!   Client Request       │  ┌──────────┐   ┌──────────┐   ┌─────────────┐   │
//!   ─────────────────────┼─▶│  http    │──▶│ routing  │──▶│  registry   │   │
//!                        │  │  server  │   │  table   │   │ (discovery) │   │
//!                        │  └──────────┘   └──────────┘   └──────┬──────┘   │
//!                        │                                       ▼          │
//!                        │                               ┌─────────────┐    │
//!                        │                               │load_balancer│    │
//!                        │                               └──────┬──────┘    │
//!                        │                                      ▼           │
//!   Client Response      │  ┌──────────┐   ┌──────────┐   ┌─────────────┐   │
//!   ◀────────────────────┼──│  http    │◀──│  http    │◀──│ breaker +   │◀──┼── Instance
//!                        │  │  server  │   │  client  │   │ retry/timeout│  │
//!                        │  └──────────┘   └──────────┘   └─────────────┘   │
//!                        │                                                  │
//!   Admin / SDK  ────────┼─▶ admin API (routes, breakers, balancers,        │
//!                        │   registration, heartbeats, health, metrics)     │
//!                        └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use adaptive_gateway::admin::setup_admin_router;
use adaptive_gateway::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use adaptive_gateway::gateway::GatewayRouter;
use adaptive_gateway::http::{HttpServer, HttpTransport};
use adaptive_gateway::lifecycle::{signals::wait_for_signal, Shutdown};
use adaptive_gateway::observability::{logging, metrics};
use adaptive_gateway::registry::HealthSweeper;

#[derive(Parser)]
#[command(name = "adaptive-gateway", version, about = "Adaptive request gateway")]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "adaptive-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        heartbeat_interval_ms = config.registry.heartbeat_interval_ms,
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

    let transport = Arc::new(HttpTransport::new(&config.transport));
    let gateway = Arc::new(GatewayRouter::from_config(&config, transport)?);
    let shutdown = Shutdown::new();

    let sweeper = HealthSweeper::new(gateway.registry().clone());
    tokio::spawn(sweeper.run(shutdown.subscribe()));

    // The watcher handle must outlive the server.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            let gateway = gateway.clone();
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    if let Err(e) = gateway.replace_routes(new_config.routes) {
                        tracing::error!(error = %e, "Reloaded routes rejected");
                    }
                }
            });
            Some(handle)
        }
        None => None,
    };

    if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
        let admin = setup_admin_router(gateway.clone(), &config.admin.api_key);
        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let result = axum::serve(admin_listener, admin)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(gateway, &config.listener);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(wait_for_signal(shutdown));
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
