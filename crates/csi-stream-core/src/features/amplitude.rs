//! Latest per-subcarrier amplitude vector.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::has_usable_data;
use crate::types::CsiRecord;

/// Amplitudes of the most recent record. `values[i]` is subcarrier `i`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmplitudeSnapshot {
    /// Timestamp of the record.
    pub timestamp: DateTime<Utc>,
    /// Topic of the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Per-subcarrier amplitudes.
    pub values: Vec<f64>,
}

/// Project the most recent record of `topic` (or of all topics).
///
/// Returns `None` when no record matches or the latest one carries no
/// usable vector.
#[must_use]
pub fn amplitude_snapshot(records: &[&CsiRecord], topic: Option<&str>) -> Option<AmplitudeSnapshot> {
    let latest = records
        .iter()
        .rev()
        .find(|r| topic.map_or(true, |t| r.has_topic(t)))?;

    if !has_usable_data(&latest.subcarriers) {
        return None;
    }

    Some(AmplitudeSnapshot {
        timestamp: latest.timestamp,
        topic: latest.topic.clone(),
        values: latest.subcarriers.clone(),
    })
}
