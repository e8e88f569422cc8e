//! CSI stream server.
//!
//! Ingests raw CSI records from the built-in simulator or an external
//! transport and serves live features over REST and WebSocket.
//!
//! Usage:
//!   cargo run -p csi-stream-server -- --http-port 8080 --source simulate

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use csi_stream_core::StreamController;
use csi_stream_server::cli::{Args, Source};
use csi_stream_server::state::{ingest_loop, new_state, stop_simulation};
use csi_stream_server::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let config = args
        .engine_config()
        .context("failed to load engine configuration")?;
    info!(
        capacity = config.buffer_capacity,
        topic_filter = %config.default_topic_filter,
        "engine configured"
    );

    let controller = StreamController::new(config)?;
    let (state, ingest_rx) = new_state(controller, args.simulation_config());
    tokio::spawn(ingest_loop(state.clone(), ingest_rx));

    match args.source {
        Source::Simulate => {
            state.write().await.start_simulation();
        }
        Source::External => info!("waiting for an external transport on /ws/ingest"),
    }

    let app = build_router(state.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], args.http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP port {}", args.http_port))?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl-C; running until killed");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server error")?;

    if let Some(emitted) = stop_simulation(&state).await? {
        info!(emitted, "simulated session stopped");
    }
    info!("Server shut down cleanly");
    Ok(())
}
