//! Real-time CSI stream normalization and feature extraction.
//!
//! Heterogeneous WiFi Channel State Information records arrive as JSON from
//! a transport (or the built-in simulator), are normalized into a canonical
//! subcarrier vector, held in a bounded rolling buffer, and turned into four
//! live features.
//!
//! # Architecture
//!
//! 1. **Normalization** ([`Normalizer`]): ordered [`ShapeMatcher`]s decode
//!    positional, indexed, delimited and fallback record layouts into a
//!    NaN-free vector.
//! 2. **Buffering** ([`StreamController`]): the single writer of a
//!    [`RollingBuffer`]; applies [`IngestEvent`]s and bumps a revision on
//!    every mutation.
//! 3. **Selection** ([`selector`]): topic filter, then recency window.
//! 4. **Extraction** ([`features`]): amplitude snapshot, subcarrier trace,
//!    variance motion indicator and zero-crossing breathing rate.
//!
//! # Example
//!
//! ```
//! use csi_stream_core::{StreamController, ViewState};
//! use serde_json::json;
//!
//! let mut controller = StreamController::default();
//! controller.ingest(&json!({"topic": "lab/csi", "CSIs": [1.0, 2.0, 3.0]}));
//!
//! let snapshot = controller.snapshot(&ViewState::for_topic("lab/csi"));
//! assert_eq!(snapshot.amplitude.unwrap().values, vec![1.0, 2.0, 3.0]);
//! ```

pub mod buffer;
pub mod config;
pub mod controller;
pub mod error;
pub mod features;
pub mod normalizer;
pub mod selector;
pub mod session;
pub mod types;

pub use buffer::{BufferState, RollingBuffer};
pub use config::EngineConfig;
pub use controller::{
    ControlCommand, ControllerStatus, IngestEvent, IngestOutcome, LinkStatus, StreamController,
};
pub use error::{ConfigError, NormalizeError, SessionError, StreamError, StreamResult};
pub use features::{FeatureConfig, FeatureSnapshot, ViewState};
pub use normalizer::{Normalizer, NormalizerConfig, ShapeMatcher};
pub use session::{SessionHandle, SimulationConfig, StreamSession};
pub use types::{CsiRecord, Passthrough, RecordShape, TimedValue};
