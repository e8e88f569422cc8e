//! REST endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use csi_stream_core::features::{
    amplitude_snapshot, breathing_rate_series, detect_motion, subcarrier_trace, AmplitudeSnapshot,
    BreathingSeries, MotionPoint, SubcarrierTrace,
};
use csi_stream_core::selector::search_topic;
use csi_stream_core::{ControlCommand, ControllerStatus, CsiRecord, FeatureSnapshot, IngestEvent, ViewState};

use crate::state::{stop_simulation, SharedState};

/// Feature view parameters from the query string.
///
/// An empty `topic` means all topics.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeatureQuery {
    pub topic: Option<String>,
    pub subcarrier: usize,
}

impl FeatureQuery {
    pub fn into_view(self) -> ViewState {
        ViewState {
            topic: self.topic.filter(|t| !t.is_empty()),
            subcarrier: self.subcarrier,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecordsQuery {
    /// Case-insensitive topic substring.
    pub search: String,
}

#[derive(Debug, Deserialize)]
pub struct TopicFilterRequest {
    #[serde(default)]
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub simulate: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub controller: ControllerStatus,
    pub simulating: bool,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub count: usize,
    pub records: Vec<CsiRecord>,
}

pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    let s = state.read().await;
    Json(json!({
        "status": "ok",
        "revision": s.controller.revision(),
        "records": s.controller.buffer().len(),
    }))
}

pub async fn status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let s = state.read().await;
    Json(StatusResponse {
        controller: s.controller.status(),
        simulating: s.is_simulating(),
    })
}

pub async fn records(
    State(state): State<SharedState>,
    Query(query): Query<RecordsQuery>,
) -> Json<RecordsResponse> {
    let s = state.read().await;
    let records: Vec<CsiRecord> = search_topic(s.controller.buffer().iter(), &query.search)
        .into_iter()
        .cloned()
        .collect();
    Json(RecordsResponse {
        count: records.len(),
        records,
    })
}

// ── Features ────────────────────────────────────────────────────────────────

pub async fn features(
    State(state): State<SharedState>,
    Query(query): Query<FeatureQuery>,
) -> Json<FeatureSnapshot> {
    let s = state.read().await;
    Json(s.controller.snapshot(&query.into_view()))
}

pub async fn amplitude(
    State(state): State<SharedState>,
    Query(query): Query<FeatureQuery>,
) -> Json<Option<AmplitudeSnapshot>> {
    let view = query.into_view();
    let s = state.read().await;
    Json(amplitude_snapshot(&s.controller.records(), view.topic()))
}

pub async fn timeseries(
    State(state): State<SharedState>,
    Query(query): Query<FeatureQuery>,
) -> Json<SubcarrierTrace> {
    let view = query.into_view();
    let s = state.read().await;
    let config = &s.controller.config().features;
    Json(subcarrier_trace(
        &s.controller.records(),
        view.topic(),
        view.subcarrier,
        config,
    ))
}

pub async fn motion(
    State(state): State<SharedState>,
    Query(query): Query<FeatureQuery>,
) -> Json<Vec<MotionPoint>> {
    let view = query.into_view();
    let s = state.read().await;
    let config = &s.controller.config().features;
    Json(detect_motion(&s.controller.records(), view.topic(), config))
}

pub async fn breathing(
    State(state): State<SharedState>,
    Query(query): Query<FeatureQuery>,
) -> Json<BreathingSeries> {
    let view = query.into_view();
    let s = state.read().await;
    let config = &s.controller.config().features;
    Json(breathing_rate_series(&s.controller.records(), view.topic(), config))
}

// ── Control ─────────────────────────────────────────────────────────────────

/// Queue one ingestion event for the consumer task.
pub async fn ingest(
    State(state): State<SharedState>,
    Json(event): Json<IngestEvent>,
) -> (StatusCode, Json<Value>) {
    let tx = state.read().await.ingest_tx.clone();
    match tx.send(event).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({"accepted": true}))),
        Err(_) => {
            warn!("ingestion queue closed; event dropped");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"accepted": false, "error": "ingestion queue closed"})),
            )
        }
    }
}

pub async fn set_topic_filter(
    State(state): State<SharedState>,
    Json(req): Json<TopicFilterRequest>,
) -> Json<ControlCommand> {
    let mut s = state.write().await;
    let command = s.controller.set_topic_filter(&req.filter);
    // Transports may not be connected yet; they receive the current filter on connect.
    let _ = s.control_tx.send(command.clone());
    Json(command)
}

pub async fn reset(State(state): State<SharedState>) -> Json<Value> {
    let mut s = state.write().await;
    s.controller.reset();
    s.notify_revision();
    Json(json!({"status": "reset", "revision": s.controller.revision()}))
}

pub async fn simulate(
    State(state): State<SharedState>,
    Json(req): Json<SimulateRequest>,
) -> (StatusCode, Json<Value>) {
    if req.simulate {
        let started = state.write().await.start_simulation();
        if started {
            info!("simulation enabled");
        }
        return (StatusCode::OK, Json(json!({"simulating": true})));
    }

    match stop_simulation(&state).await {
        Ok(emitted) => {
            if let Some(emitted) = emitted {
                info!(emitted, "simulation disabled");
            }
            (StatusCode::OK, Json(json!({"simulating": false})))
        }
        Err(e) => {
            warn!(error = %e, "simulated session ended abnormally");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"simulating": false, "error": e.to_string()})),
            )
        }
    }
}
