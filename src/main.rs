//! scriptserve
//!
//! Serves the configured static mounts plus `GET /health`, and optionally a
//! standalone WebSocket echo server.
//!
//! ```text
//!     Client ──▶ HttpServer ──▶ static mounts / routes / upgrades
//!     Client ──▶ WebSocketServer (websocket.bind_address) ──▶ echo
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use scriptserve::config::{load_config, ServerConfig};
use scriptserve::observability::{logging, metrics};
use scriptserve::{HttpServer, Response, WebSocketServer};

#[derive(Parser)]
#[command(name = "scriptserve")]
#[command(about = "Embeddable HTTP + WebSocket application server", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("scriptserve v{} starting", env!("CARGO_PKG_VERSION"));

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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let ws_server = WebSocketServer::from_config(&config.websocket).map(|mut server| {
        let clients = server.clients();
        server.on_message(move |id, text| {
            clients.send(id, text);
            Ok(())
        });
        Arc::new(server)
    });

    let mut server = HttpServer::new(config);
    server.get("/health", |_| {
        Ok(Response::json(StatusCode::OK, json!({"status": "healthy"})))
    })?;

    let http_shutdown = server.shutdown_handle();
    let ws_shutdown = ws_server.as_ref().map(|ws| ws.shutdown_handle());
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        tracing::info!("Shutdown signal received");
        http_shutdown.trigger();
        if let Some(ws) = ws_shutdown {
            ws.trigger();
        }
    });

    if let Some(ws) = ws_server {
        tokio::spawn(async move {
            if let Err(e) = ws.serve().await {
                tracing::error!(error = %e, "WebSocket server failed");
            }
        });
    }

    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
