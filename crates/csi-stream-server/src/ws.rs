//! WebSocket streams.
//!
//! `/ws/ingest` is the transport side: text frames carry ingestion
//! envelopes in, and control commands go back out. `/ws/features` pushes a
//! fresh feature snapshot every time the buffer revision changes.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use csi_stream_core::{ControlCommand, IngestEvent, ViewState};

use crate::routes::FeatureQuery;
use crate::state::SharedState;

pub async fn ws_ingest_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ingest_client(socket, state))
}

async fn handle_ingest_client(mut socket: WebSocket, state: SharedState) {
    let (ingest_tx, mut control_rx, current) = {
        let s = state.read().await;
        (
            s.ingest_tx.clone(),
            s.control_tx.subscribe(),
            ControlCommand::SetTopicFilter {
                filter: s.controller.topic_filter().to_string(),
            },
        )
    };

    info!("transport connected (ingest)");

    if send_json(&mut socket, &current).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            cmd = control_rx.recv() => {
                match cmd {
                    Ok(cmd) => {
                        if send_json(&mut socket, &cmd).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => warn!(skipped = n, "transport lagging behind control commands"),
                    Err(RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match IngestEvent::from_json_str(text.as_str()) {
                        Ok(event) => {
                            if ingest_tx.send(event).await.is_err() {
                                warn!("ingestion queue closed");
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "ignoring malformed envelope"),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(error = %e, "ingest socket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("transport disconnected (ingest)");
}

pub async fn ws_features_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Query(query): Query<FeatureQuery>,
) -> impl IntoResponse {
    let view = query.into_view();
    ws.on_upgrade(move |socket| handle_features_client(socket, state, view))
}

async fn handle_features_client(mut socket: WebSocket, state: SharedState, view: ViewState) {
    let mut revisions = state.read().await.revision_tx.subscribe();

    info!(topic = view.topic().unwrap_or("*"), "feature subscriber connected");

    if push_snapshot(&mut socket, &state, &view).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            rev = revisions.recv() => {
                match rev {
                    // A lagged subscriber just skips to the latest state.
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        if push_snapshot(&mut socket, &state, &view).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    info!("feature subscriber disconnected");
}

async fn push_snapshot(
    socket: &mut WebSocket,
    state: &SharedState,
    view: &ViewState,
) -> Result<(), axum::Error> {
    let snapshot = state.read().await.controller.snapshot(view);
    send_json(socket, &snapshot).await
}

async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), axum::Error> {
    match serde_json::to_string(value) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!(error = %e, "failed to serialize outbound message");
            Ok(())
        }
    }
}
