//! Simulated CSI source.
//!
//! A [`StreamSession`] emits synthetic raw records into an ingestion channel
//! on a fixed tick, standing in for a live transport during development.
//! Amplitudes are deterministic per tick: a slow sinusoid across
//! subcarriers, a breathing modulation shared by every subcarrier, and a
//! periodic high-variance motion burst.
//!
//! The session is owned by whoever started it. [`SessionHandle::stop`]
//! signals cancellation over a `watch` channel and joins the task.

use std::f64::consts::PI;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::controller::IngestEvent;
use crate::error::SessionError;

/// Shortest tick the session will run at.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Parameters of the synthetic signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Topic stamped on every record.
    pub topic: String,
    /// Device identifier stamped on every record.
    pub device_id: String,
    /// Subcarriers per record.
    pub n_subcarriers: usize,
    /// Interval between records.
    pub tick: Duration,
    /// Mean amplitude.
    pub amplitude_base: f64,
    /// Breathing modulation frequency (Hz of simulated time).
    pub breathing_hz: f64,
    /// Ticks between motion bursts; `0` disables motion.
    pub motion_period_ticks: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            topic: "csi/simulated".to_string(),
            device_id: "sim-0".to_string(),
            n_subcarriers: 64,
            tick: Duration::from_millis(1000),
            amplitude_base: 15.0,
            breathing_hz: 0.25,
            motion_period_ticks: 40,
        }
    }
}

/// Build the raw record for `tick`.
///
/// Simulated time advances by the configured tick per record, so the
/// breathing modulation keeps its frequency regardless of wall clock jitter.
#[must_use]
pub fn simulated_record(config: &SimulationConfig, tick: u64, timestamp: DateTime<Utc>) -> Value {
    let t = tick as f64 * config.tick.as_secs_f64();
    let breathing = 2.0 * (2.0 * PI * config.breathing_hz * t).sin();
    let in_burst = config.motion_period_ticks > 0
        && tick % config.motion_period_ticks < (config.motion_period_ticks / 4).max(1);
    let jitter_scale = if in_burst { 4.0 } else { 0.2 };

    let amplitudes: Vec<f64> = (0..config.n_subcarriers)
        .map(|i| {
            let i = i as f64;
            let base = config.amplitude_base + 5.0 * (i * 0.1 + t * 0.3).sin();
            let jitter = (i * 7.3 + tick as f64 * 13.7).sin() * jitter_scale;
            (base + breathing + jitter).max(0.1)
        })
        .collect();

    json!({
        "timestamp": timestamp.to_rfc3339(),
        "topic": config.topic,
        "device_id": config.device_id,
        "rssi": -40.0 + 5.0 * (t * 0.2).sin(),
        "CSIs": amplitudes,
    })
}

/// Handle to a running [`StreamSession`].
///
/// Dropping the handle without calling [`stop`](Self::stop) also ends the
/// task at its next tick.
#[derive(Debug)]
pub struct SessionHandle {
    cancel: watch::Sender<bool>,
    join: JoinHandle<u64>,
}

impl SessionHandle {
    /// Whether the generator task is still alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Cancel the session and wait for it to finish.
    ///
    /// Returns the number of records emitted.
    ///
    /// # Errors
    ///
    /// [`SessionError::Join`] if the task panicked or was aborted.
    pub async fn stop(self) -> Result<u64, SessionError> {
        // The task may already have exited; a closed receiver is fine.
        let _ = self.cancel.send(true);
        self.join
            .await
            .map_err(|e| SessionError::Join(e.to_string()))
    }
}

/// Simulated record generator.
pub struct StreamSession {
    config: SimulationConfig,
    sink: mpsc::Sender<IngestEvent>,
    tick: u64,
}

impl StreamSession {
    /// Spawn a generator that sends one [`IngestEvent::Data`] per tick into `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: SimulationConfig, sink: mpsc::Sender<IngestEvent>) -> SessionHandle {
        let (cancel, cancel_rx) = watch::channel(false);
        let session = Self {
            config,
            sink,
            tick: 0,
        };
        let join = tokio::spawn(session.run(cancel_rx));
        SessionHandle { cancel, join }
    }

    async fn run(mut self, mut cancel: watch::Receiver<bool>) -> u64 {
        let period = self.config.tick.max(MIN_TICK);
        let mut interval = tokio::time::interval(period);
        info!(
            topic = %self.config.topic,
            subcarriers = self.config.n_subcarriers,
            tick_ms = period.as_millis() as u64,
            "simulated session started"
        );

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    let payload = simulated_record(&self.config, self.tick, Utc::now());
                    if self.sink.send(IngestEvent::Data { payload }).await.is_err() {
                        debug!("ingestion channel closed");
                        break;
                    }
                    self.tick += 1;
                }
            }
        }

        info!(emitted = self.tick, "simulated session stopped");
        self.tick
    }
}
