//! Shared server state and the single ingestion consumer.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info};

use csi_stream_core::{
    ControlCommand, IngestEvent, SessionHandle, SimulationConfig, StreamController, StreamResult,
    StreamSession,
};

/// Queue depth between transports and the ingestion consumer.
pub const INGEST_QUEUE_DEPTH: usize = 256;
/// Buffered revision notifications per feature subscriber.
const REVISION_CHANNEL_DEPTH: usize = 64;
/// Buffered control commands per transport subscriber.
const CONTROL_CHANNEL_DEPTH: usize = 16;

/// Everything the HTTP and WebSocket handlers share.
pub struct AppStateInner {
    /// Buffer owner; only the ingestion consumer and explicit control
    /// endpoints mutate it.
    pub controller: StreamController,
    /// Parameters for the simulated source.
    pub simulation: SimulationConfig,
    /// Running simulated session, if any.
    session: Option<SessionHandle>,
    /// Producer side of the ingestion queue.
    pub ingest_tx: mpsc::Sender<IngestEvent>,
    /// Buffer revision notifications.
    pub revision_tx: broadcast::Sender<u64>,
    /// Outbound commands for connected transports.
    pub control_tx: broadcast::Sender<ControlCommand>,
}

pub type SharedState = Arc<RwLock<AppStateInner>>;

impl AppStateInner {
    /// Whether a simulated session is currently producing records.
    pub fn is_simulating(&self) -> bool {
        self.session.as_ref().is_some_and(SessionHandle::is_running)
    }

    /// Start the simulated source unless one is already running.
    ///
    /// Returns `false` if a session was already active.
    pub fn start_simulation(&mut self) -> bool {
        if self.is_simulating() {
            return false;
        }
        self.session = Some(StreamSession::start(
            self.simulation.clone(),
            self.ingest_tx.clone(),
        ));
        true
    }

    /// Detach the current session so it can be stopped without holding the lock.
    pub fn take_session(&mut self) -> Option<SessionHandle> {
        self.session.take()
    }

    /// Notify feature subscribers of the controller's current revision.
    pub fn notify_revision(&self) {
        // No subscribers is not an error.
        let _ = self.revision_tx.send(self.controller.revision());
    }
}

/// Build the shared state and the receiving end of the ingestion queue.
pub fn new_state(
    controller: StreamController,
    simulation: SimulationConfig,
) -> (SharedState, mpsc::Receiver<IngestEvent>) {
    let (ingest_tx, ingest_rx) = mpsc::channel(INGEST_QUEUE_DEPTH);
    let (revision_tx, _) = broadcast::channel(REVISION_CHANNEL_DEPTH);
    let (control_tx, _) = broadcast::channel(CONTROL_CHANNEL_DEPTH);
    let state = AppStateInner {
        controller,
        simulation,
        session: None,
        ingest_tx,
        revision_tx,
        control_tx,
    };
    (Arc::new(RwLock::new(state)), ingest_rx)
}

/// Stop the simulated session, if one is running.
///
/// The lock is released before joining so the session can drain its last
/// send into the ingestion queue. A session that ended abnormally surfaces
/// as [`StreamError::Session`](csi_stream_core::StreamError::Session).
pub async fn stop_simulation(state: &SharedState) -> StreamResult<Option<u64>> {
    let handle = state.write().await.take_session();
    match handle {
        Some(handle) => Ok(Some(handle.stop().await?)),
        None => Ok(None),
    }
}

/// Apply queued ingestion events one at a time.
///
/// Never returns: the loop holds a `SharedState`, which owns a sender, so
/// the queue cannot close underneath it. Spawn it once per state.
pub async fn ingest_loop(state: SharedState, mut rx: mpsc::Receiver<IngestEvent>) {
    info!("ingestion consumer started");
    while let Some(event) = rx.recv().await {
        let mut s = state.write().await;
        let outcome = s.controller.handle_event(event);
        if outcome.changed_buffer() {
            s.notify_revision();
        } else {
            debug!(?outcome, "event did not change the buffer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn ingest_loop_applies_events_and_notifies() {
        let (state, rx) = new_state(StreamController::default(), SimulationConfig::default());
        let (tx, mut revisions) = {
            let s = state.read().await;
            (s.ingest_tx.clone(), s.revision_tx.subscribe())
        };
        tokio::spawn(ingest_loop(state.clone(), rx));

        tx.send(IngestEvent::Data {
            payload: json!({"topic": "a", "CSIs": [1, 2]}),
        })
        .await
        .unwrap();
        assert_eq!(revisions.recv().await.unwrap(), 1);
        assert_eq!(state.read().await.controller.buffer().len(), 1);
    }

    #[tokio::test]
    async fn simulation_start_and_stop() {
        let sim = SimulationConfig {
            tick: Duration::from_millis(5),
            ..SimulationConfig::default()
        };
        let (state, rx) = new_state(StreamController::default(), sim);
        let mut revisions = state.read().await.revision_tx.subscribe();
        tokio::spawn(ingest_loop(state.clone(), rx));

        assert!(state.write().await.start_simulation());
        assert!(!state.write().await.start_simulation());
        assert!(revisions.recv().await.unwrap() >= 1);

        let emitted = stop_simulation(&state).await.unwrap();
        assert!(emitted.is_some_and(|n| n >= 1));
        assert!(!state.read().await.is_simulating());
        assert_eq!(stop_simulation(&state).await.unwrap(), None);
    }
}
