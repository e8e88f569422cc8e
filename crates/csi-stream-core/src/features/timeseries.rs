//! Single-subcarrier amplitude trace.
//!
//! Records too short to hold the selected index are skipped without a
//! placeholder, so gaps are not signalled. Renderers treat the output as a
//! uniformly spaced category axis.

use serde::Serialize;

use super::FeatureConfig;
use crate::selector::feature_window;
use crate::types::{CsiRecord, TimedValue};

/// Amplitude of one subcarrier over the recent window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubcarrierTrace {
    /// Subcarrier index traced.
    pub subcarrier: usize,
    /// `(timestamp, amplitude)` pairs in arrival order.
    pub points: Vec<TimedValue>,
}

impl SubcarrierTrace {
    /// Whether the trace has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Trace subcarrier `k` across the last `window_points` records of `topic`.
#[must_use]
pub fn subcarrier_trace(
    records: &[&CsiRecord],
    topic: Option<&str>,
    k: usize,
    config: &FeatureConfig,
) -> SubcarrierTrace {
    let window = feature_window(records.iter().copied(), topic, config.window_points);
    let points = window
        .iter()
        .filter_map(|r| r.subcarrier(k).map(|v| TimedValue::new(r.timestamp, v)))
        .collect();

    SubcarrierTrace {
        subcarrier: k,
        points,
    }
}
