//! End-to-end tests for the WebSocket streams.
//!
//! Each test binds the real router to an ephemeral port and connects a
//! WebSocket client to it.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use csi_stream_core::{IngestEvent, SimulationConfig, StreamController};
use csi_stream_server::build_router;
use csi_stream_server::state::{ingest_loop, new_state, SharedState};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn_server() -> (SocketAddr, SharedState) {
    let (state, rx) = new_state(StreamController::default(), SimulationConfig::default());
    tokio::spawn(ingest_loop(state.clone(), rx));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}{path}")).await.unwrap();
    client
}

/// Next text frame, parsed as JSON.
async fn next_json(client: &mut Client) -> Value {
    loop {
        let msg = timeout(FRAME_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .unwrap();
        if msg.is_text() {
            return serde_json::from_str(msg.to_text().unwrap()).unwrap();
        }
    }
}

// ---------------------------------------------------------------------------
// /ws/ingest
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ingest_socket_announces_topic_filter_first() {
    let (addr, _) = spawn_server().await;
    let mut client = connect(addr, "/ws/ingest").await;

    let first = next_json(&mut client).await;
    assert_eq!(first, json!({"type": "set_topic_filter", "filter": "#"}));
}

#[tokio::test]
async fn malformed_frame_is_ignored_and_valid_frame_ingested() {
    let (addr, state) = spawn_server().await;
    let mut revisions = state.read().await.revision_tx.subscribe();
    let mut client = connect(addr, "/ws/ingest").await;
    next_json(&mut client).await;

    client.send(Message::text("{ not an envelope")).await.unwrap();
    client.send(Message::text(r#"{"type":"bogus"}"#)).await.unwrap();
    client
        .send(Message::text(
            r#"{"type":"data","payload":{"topic":"lab","CSIs":[1.0,2.0]}}"#,
        ))
        .await
        .unwrap();

    // Frames on one socket are queued in order, so the first revision bump
    // can only come from the valid envelope.
    let rev = timeout(FRAME_TIMEOUT, revisions.recv()).await.unwrap().unwrap();
    assert_eq!(rev, 1);

    let s = state.read().await;
    assert_eq!(s.controller.revision(), 1);
    assert_eq!(s.controller.buffer().len(), 1);
}

#[tokio::test]
async fn ingest_socket_forwards_topic_filter_changes() {
    let (addr, state) = spawn_server().await;
    let mut client = connect(addr, "/ws/ingest").await;
    next_json(&mut client).await;

    let cmd = state.write().await.controller.set_topic_filter("home/+/csi");
    state.read().await.control_tx.send(cmd).unwrap();

    let forwarded = next_json(&mut client).await;
    assert_eq!(forwarded, json!({"type": "set_topic_filter", "filter": "home/+/csi"}));
}

// ---------------------------------------------------------------------------
// /ws/features
// ---------------------------------------------------------------------------

#[tokio::test]
async fn features_socket_pushes_snapshot_after_ingest() {
    let (addr, state) = spawn_server().await;
    let mut client = connect(addr, "/ws/features?topic=lab").await;

    let initial = next_json(&mut client).await;
    assert_eq!(initial["revision"], 0);
    assert_eq!(initial["topic"], "lab");
    assert!(initial["amplitude"].is_null());

    let tx = state.read().await.ingest_tx.clone();
    tx.send(IngestEvent::Data {
        payload: json!({"topic": "lab", "CSIs": [3.0, 4.0, 5.0]}),
    })
    .await
    .unwrap();

    let pushed = next_json(&mut client).await;
    assert_eq!(pushed["revision"], 1);
    assert_eq!(pushed["amplitude"]["values"], json!([3.0, 4.0, 5.0]));
}
