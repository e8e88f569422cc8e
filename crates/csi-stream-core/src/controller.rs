//! Stream controller: the single writer of the rolling buffer.
//!
//! The controller owns the normalizer and the buffer, applies ingestion
//! events in arrival order, and computes feature snapshots from a consistent
//! view. Per-record failures are logged and dropped here; nothing upstream
//! ever sees them as errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::buffer::{BufferState, RollingBuffer};
use crate::config::{EngineConfig, MATCH_ALL_TOPICS};
use crate::error::{ConfigError, NormalizeError, StreamResult};
use crate::features::{extract_all, FeatureSnapshot, ViewState};
use crate::normalizer::Normalizer;
use crate::selector::topics;
use crate::types::CsiRecord;

// ── Wire messages ──────────────────────────────────────────────────────────

/// Inbound message from a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestEvent {
    /// One raw record.
    Data {
        /// Raw record as published by the device.
        payload: Value,
    },
    /// Historical records that replace the buffer contents.
    InitialData {
        /// Raw records, oldest first.
        data: Vec<Value>,
    },
    /// Link state reported by the transport.
    ConnectionStatus {
        /// Whether the transport is connected upstream.
        connected: bool,
        /// Subscription pattern the transport is using.
        #[serde(default)]
        topic_filter: Option<String>,
        /// Upstream broker address.
        #[serde(default)]
        broker: Option<String>,
    },
}

impl IngestEvent {
    /// Decode a JSON text frame.
    ///
    /// # Errors
    ///
    /// [`StreamError::Envelope`](crate::error::StreamError::Envelope) when the
    /// text is not a known envelope.
    pub fn from_json_str(text: &str) -> StreamResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Outbound instruction for the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlCommand {
    /// Change the upstream subscription pattern.
    SetTopicFilter {
        /// New pattern; `#` subscribes to everything.
        filter: String,
    },
}

/// What applying an event did to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// A record was appended.
    Appended {
        /// Records evicted from the head to stay within capacity.
        evicted: usize,
    },
    /// The buffer was replaced by an initial batch.
    Loaded {
        /// Records now in the buffer.
        kept: usize,
        /// Raw records that failed to normalize.
        rejected: usize,
    },
    /// Link status was recorded; the buffer is untouched.
    StatusUpdated,
    /// The record could not be normalized and was dropped.
    Rejected(NormalizeError),
}

impl IngestOutcome {
    /// Whether the buffer contents changed.
    #[must_use]
    pub fn changed_buffer(&self) -> bool {
        matches!(self, Self::Appended { .. } | Self::Loaded { .. })
    }
}

/// Upstream link state as last reported by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    /// Whether the transport is connected.
    pub connected: bool,
    /// Upstream broker address, if reported.
    pub broker: Option<String>,
}

/// Point-in-time summary of the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerStatus {
    /// Buffer occupancy state.
    pub state: BufferState,
    /// Records buffered.
    pub len: usize,
    /// Buffer capacity.
    pub capacity: usize,
    /// Buffer revision.
    pub revision: u64,
    /// Active subscription pattern.
    pub topic_filter: String,
    /// Upstream link state.
    pub link: LinkStatus,
    /// Distinct buffered topics, first-seen order.
    pub topics: Vec<String>,
}

// ── Controller ─────────────────────────────────────────────────────────────

/// Owns the rolling buffer and applies ingestion events to it.
#[derive(Debug)]
pub struct StreamController {
    config: EngineConfig,
    normalizer: Normalizer,
    buffer: RollingBuffer,
    topic_filter: String,
    link: LinkStatus,
    revision: u64,
}

impl StreamController {
    /// Create a controller from a validated configuration.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from [`EngineConfig::validate`].
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let topic_filter = normalize_filter(&config.default_topic_filter);
        Ok(Self {
            normalizer: Normalizer::new(&config.normalizer),
            buffer: RollingBuffer::new(config.buffer_capacity),
            topic_filter,
            link: LinkStatus::default(),
            revision: 0,
            config,
        })
    }

    /// Normalize and append one raw record.
    pub fn ingest(&mut self, raw: &Value) -> IngestOutcome {
        self.ingest_at(raw, Utc::now())
    }

    /// Like [`ingest`](Self::ingest), with an explicit receive time.
    pub fn ingest_at(&mut self, raw: &Value, received_at: DateTime<Utc>) -> IngestOutcome {
        match self.normalizer.normalize_at(raw, received_at) {
            Ok(record) => {
                debug!(
                    topic = record.topic.as_deref().unwrap_or("-"),
                    shape = ?record.shape,
                    subcarriers = record.subcarriers.len(),
                    "record ingested"
                );
                let evicted = self.buffer.push(record);
                self.bump();
                IngestOutcome::Appended { evicted }
            }
            Err(e) => {
                warn!(error = %e, "dropping record");
                IngestOutcome::Rejected(e)
            }
        }
    }

    /// Replace the buffer with an initial batch, keeping the last `C` records.
    pub fn load_initial(&mut self, raws: &[Value]) -> IngestOutcome {
        let received_at = Utc::now();
        let mut rejected = 0;
        let records: Vec<CsiRecord> = raws
            .iter()
            .filter_map(|raw| match self.normalizer.normalize_at(raw, received_at) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "dropping record from initial batch");
                    rejected += 1;
                    None
                }
            })
            .collect();

        self.buffer.replace(records);
        self.bump();
        info!(kept = self.buffer.len(), rejected, "initial data loaded");
        IngestOutcome::Loaded {
            kept: self.buffer.len(),
            rejected,
        }
    }

    /// Apply any inbound event.
    pub fn handle_event(&mut self, event: IngestEvent) -> IngestOutcome {
        match event {
            IngestEvent::Data { payload } => self.ingest(&payload),
            IngestEvent::InitialData { data } => self.load_initial(&data),
            IngestEvent::ConnectionStatus {
                connected,
                topic_filter,
                broker,
            } => {
                info!(connected, broker = broker.as_deref().unwrap_or("-"), "link status");
                self.link = LinkStatus { connected, broker };
                if let Some(filter) = topic_filter {
                    self.topic_filter = normalize_filter(&filter);
                }
                IngestOutcome::StatusUpdated
            }
        }
    }

    /// Store a new subscription pattern and return the command for the transport.
    ///
    /// An empty pattern means every topic. The buffer is not filtered.
    pub fn set_topic_filter(&mut self, pattern: &str) -> ControlCommand {
        self.topic_filter = normalize_filter(pattern);
        info!(filter = %self.topic_filter, "topic filter changed");
        ControlCommand::SetTopicFilter {
            filter: self.topic_filter.clone(),
        }
    }

    /// Drop every buffered record.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.bump();
        info!("buffer reset");
    }

    /// Compute every feature for `view` from the current buffer.
    #[must_use]
    pub fn snapshot(&self, view: &ViewState) -> FeatureSnapshot {
        let records = self.buffer.view();
        extract_all(&records, view, &self.config.features, self.revision)
    }

    /// Buffered records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<&CsiRecord> {
        self.buffer.view()
    }

    /// The underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &RollingBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn state(&self) -> BufferState {
        self.buffer.state()
    }

    /// Monotonic counter bumped on every buffer mutation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn topic_filter(&self) -> &str {
        &self.topic_filter
    }

    #[must_use]
    pub fn link(&self) -> &LinkStatus {
        &self.link
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Summary for status reporting.
    #[must_use]
    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            state: self.buffer.state(),
            len: self.buffer.len(),
            capacity: self.buffer.capacity(),
            revision: self.revision,
            topic_filter: self.topic_filter.clone(),
            link: self.link.clone(),
            topics: topics(self.buffer.iter()),
        }
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl Default for StreamController {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            normalizer: Normalizer::new(&config.normalizer),
            buffer: RollingBuffer::new(config.buffer_capacity),
            topic_filter: normalize_filter(&config.default_topic_filter),
            link: LinkStatus::default(),
            revision: 0,
            config,
        }
    }
}

fn normalize_filter(pattern: &str) -> String {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        MATCH_ALL_TOPICS.to_string()
    } else {
        trimmed.to_string()
    }
}
