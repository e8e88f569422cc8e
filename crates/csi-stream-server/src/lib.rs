//! HTTP/WebSocket host for the CSI stream engine.
//!
//! All ingestion (simulated session, `POST /api/v1/ingest`, `/ws/ingest`)
//! funnels through one `mpsc` queue into a single consumer task that owns
//! writes to the [`StreamController`](csi_stream_core::StreamController).
//! Feature readers take a shared lock and always see a consistent buffer.

pub mod cli;
pub mod routes;
pub mod state;
pub mod ws;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

/// Build the full application router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/v1/status", get(routes::status))
        .route("/api/v1/records", get(routes::records))
        // Features
        .route("/api/v1/features", get(routes::features))
        .route("/api/v1/features/amplitude", get(routes::amplitude))
        .route("/api/v1/features/timeseries", get(routes::timeseries))
        .route("/api/v1/features/motion", get(routes::motion))
        .route("/api/v1/features/breathing", get(routes::breathing))
        // Control
        .route("/api/v1/ingest", post(routes::ingest))
        .route("/api/v1/topic-filter", post(routes::set_topic_filter))
        .route("/api/v1/reset", post(routes::reset))
        .route("/api/v1/simulate", post(routes::simulate))
        // Streams
        .route("/ws/ingest", get(ws::ws_ingest_handler))
        .route("/ws/features", get(ws::ws_features_handler))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
