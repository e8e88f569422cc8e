//! Canonical CSI record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which decode shape produced a record's subcarrier vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordShape {
    /// Array of numbers or numeric strings, taken positionally.
    Positional,
    /// Array of `{index, amplitude, phase}` entries placed by explicit index.
    Indexed,
    /// Comma-separated string of numeric tokens.
    Delimited,
    /// First array field with at least one nonzero value.
    Fallback,
    /// No usable values were found.
    Empty,
}

/// Source fields carried through without interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Passthrough {
    /// Received signal strength (dBm).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<f64>,
    /// Signal-to-noise ratio (dB).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snr: Option<f64>,
    /// Ambient temperature reported by the device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Ambient humidity reported by the device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Free-form signal quality label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_quality: Option<String>,
}

/// A normalized CSI measurement.
///
/// Created once by the normalizer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsiRecord {
    /// Measurement time; ingestion time when the source carried none.
    pub timestamp: DateTime<Utc>,
    /// Logical stream the record was published on.
    pub topic: Option<String>,
    /// Originating device.
    pub device_id: Option<String>,
    /// Per-subcarrier amplitudes. Index `i` is subcarrier `i`; never NaN.
    pub subcarriers: Vec<f64>,
    /// Breathing rate estimated on-device, when the source provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breathing_rate: Option<f64>,
    /// Opaque passthrough fields.
    #[serde(default)]
    pub passthrough: Passthrough,
    /// Decode shape that produced `subcarriers`.
    pub shape: RecordShape,
}

impl CsiRecord {
    /// Create a record from an already-numeric subcarrier vector.
    ///
    /// Non-finite amplitudes are coerced to `0.0`.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, topic: Option<String>, subcarriers: Vec<f64>) -> Self {
        let subcarriers: Vec<f64> = subcarriers
            .into_iter()
            .map(|v| if v.is_finite() { v } else { 0.0 })
            .collect();
        let shape = if subcarriers.is_empty() {
            RecordShape::Empty
        } else {
            RecordShape::Positional
        };
        Self {
            timestamp,
            topic,
            device_id: None,
            subcarriers,
            breathing_rate: None,
            passthrough: Passthrough::default(),
            shape,
        }
    }

    /// Attach a precomputed breathing rate.
    #[must_use]
    pub fn with_breathing_rate(mut self, bpm: f64) -> Self {
        self.breathing_rate = Some(bpm);
        self
    }

    /// Whether the record carries data any extractor can use.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        crate::features::has_usable_data(&self.subcarriers)
    }

    /// Amplitude at subcarrier `k`, if the vector is long enough.
    #[must_use]
    pub fn subcarrier(&self, k: usize) -> Option<f64> {
        self.subcarriers.get(k).copied()
    }

    /// Whether the record was published on `topic`.
    #[must_use]
    pub fn has_topic(&self, topic: &str) -> bool {
        self.topic.as_deref() == Some(topic)
    }
}

/// A scalar feature value stamped with the time of the record it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedValue {
    /// Timestamp of the source record.
    pub timestamp: DateTime<Utc>,
    /// Feature value.
    pub value: f64,
}

impl TimedValue {
    /// Create a new timed value.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_coerces_non_finite() {
        let rec = CsiRecord::new(Utc::now(), None, vec![1.0, f64::NAN, f64::INFINITY]);
        assert_eq!(rec.subcarriers, vec![1.0, 0.0, 0.0]);
        assert_eq!(rec.shape, RecordShape::Positional);
    }

    #[test]
    fn empty_record_is_not_usable() {
        let rec = CsiRecord::new(Utc::now(), Some("csi/a".into()), Vec::new());
        assert_eq!(rec.shape, RecordShape::Empty);
        assert!(!rec.is_usable());
        assert!(rec.has_topic("csi/a"));
        assert!(!rec.has_topic("csi/A"));
    }

    #[test]
    fn subcarrier_lookup_is_bounds_checked() {
        let rec = CsiRecord::new(Utc::now(), None, vec![4.0, 5.0]);
        assert_eq!(rec.subcarrier(1), Some(5.0));
        assert_eq!(rec.subcarrier(2), None);
    }

    #[test]
    fn record_serde_roundtrip_keeps_breathing_rate() {
        let rec = CsiRecord::new(Utc::now(), Some("t".into()), vec![1.0]).with_breathing_rate(14.5);
        let json = serde_json::to_string(&rec).unwrap();
        let parsed: CsiRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.breathing_rate, Some(14.5));
        assert_eq!(parsed, rec);
    }
}
