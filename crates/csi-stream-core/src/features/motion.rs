//! Variance-threshold motion indicator.
//!
//! Each record's subcarrier vector is reduced to its population variance and
//! compared against a fixed threshold. The threshold is static: no noise-floor
//! calibration per device or topic.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{population_variance, FeatureConfig};
use crate::selector::feature_window;
use crate::types::CsiRecord;

/// Motion classification of one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionPoint {
    /// Timestamp of the record.
    pub timestamp: DateTime<Utc>,
    /// Population variance of the record's subcarrier vector.
    pub variance: f64,
    /// Whether the variance exceeded the threshold.
    pub motion: bool,
}

impl MotionPoint {
    /// Stepped chart value: `1.0` for motion, `0.0` otherwise.
    #[must_use]
    pub fn step(&self) -> f64 {
        if self.motion {
            1.0
        } else {
            0.0
        }
    }
}

/// Classify the last `window_points` records of `topic`.
///
/// Records with an empty vector emit nothing.
#[must_use]
pub fn detect_motion(
    records: &[&CsiRecord],
    topic: Option<&str>,
    config: &FeatureConfig,
) -> Vec<MotionPoint> {
    feature_window(records.iter().copied(), topic, config.window_points)
        .into_iter()
        .filter_map(|r| {
            let variance = population_variance(&r.subcarriers)?;
            Some(MotionPoint {
                timestamp: r.timestamp,
                variance,
                motion: variance > config.motion_threshold,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(vectors: Vec<Vec<f64>>) -> Vec<MotionPoint> {
        let now = Utc::now();
        let recs: Vec<CsiRecord> = vectors
            .into_iter()
            .map(|v| CsiRecord::new(now, None, v))
            .collect();
        let view: Vec<&CsiRecord> = recs.iter().collect();
        detect_motion(&view, None, &FeatureConfig::default())
    }

    #[test]
    fn constant_vectors_are_still() {
        let points = classify(vec![vec![1.0, 1.0, 1.0]; 5]);
        assert_eq!(points.len(), 5);
        assert!(points.iter().all(|p| !p.motion && p.variance.abs() < f64::EPSILON));
        assert!(points.iter().all(|p| p.step() == 0.0));
    }

    #[test]
    fn high_variance_is_motion() {
        let points = classify(vec![vec![0.0, 10.0, 0.0, 10.0]]);
        assert_eq!(points.len(), 1);
        assert!((points[0].variance - 25.0).abs() < f64::EPSILON);
        assert!(points[0].motion);
        assert!((points[0].step() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_vectors_are_skipped() {
        let points = classify(vec![vec![1.0], vec![], vec![0.0, 2.0]]);
        assert_eq!(points.len(), 2);
        assert!(!points[0].motion);
        // variance of [0, 2] is 1.0 > 0.5
        assert!(points[1].motion);
    }

    #[test]
    fn variance_equal_to_threshold_is_not_motion() {
        let rec = CsiRecord::new(Utc::now(), None, vec![0.0, 2.0]);
        let cfg = FeatureConfig {
            motion_threshold: 1.0,
            ..FeatureConfig::default()
        };
        let points = detect_motion(&[&rec], None, &cfg);
        assert!((points[0].variance - 1.0).abs() < f64::EPSILON);
        assert!(!points[0].motion);
    }
}
