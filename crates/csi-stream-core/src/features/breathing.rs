//! Breathing rate from windowed zero-crossing analysis.
//!
//! Each record is reduced to the mean of its subcarrier vector. For every
//! position `i >= W`, the `W` means preceding it are zero-centred and their
//! sign changes counted; two crossings make one breath. Each record stands for
//! `record_period_secs` of time, so the rate is
//! `(crossings / 2) * (60 / (W * record_period_secs))`, clamped to
//! `[0, breathing_max_bpm]`.
//!
//! This is a coarse respiration proxy, not a validated physiological
//! measurement.
//!
//! Devices that estimate breathing on board publish a `breathing_rate`
//! field. When any record in the window carries it, those values are used
//! directly and no windowing takes place.

use serde::Serialize;

use super::{mean, FeatureConfig};
use crate::selector::{filter_by_topic, last_n};
use crate::types::{CsiRecord, TimedValue};

/// Which source produced a breathing series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreathingMode {
    /// Estimated here from subcarrier means.
    Windowed,
    /// Reported by the device in the `breathing_rate` field.
    Precomputed,
}

/// Breathing rate over time, in breaths per minute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreathingSeries {
    /// Source of the values.
    pub mode: BreathingMode,
    /// Rate at each emitting record's timestamp.
    pub points: Vec<TimedValue>,
}

impl BreathingSeries {
    /// Whether the series has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent rate, if any.
    #[must_use]
    pub fn latest(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }
}

/// Count sign changes between strictly positive and strictly negative samples.
///
/// Exact zeros never count on their own: they carry the previous sign, so
/// `[1, 0, -1]` is one crossing and `[1, 0, 1]` is none.
#[must_use]
pub fn count_zero_crossings(signal: &[f64]) -> usize {
    let mut last_sign = 0_i8;
    let mut crossings = 0;
    for &v in signal {
        let sign = if v > 0.0 {
            1
        } else if v < 0.0 {
            -1
        } else {
            continue;
        };
        if last_sign != 0 && sign != last_sign {
            crossings += 1;
        }
        last_sign = sign;
    }
    crossings
}

/// Breathing rate (BPM) of one window of per-record means.
#[must_use]
pub fn window_breathing_rate(means: &[f64], config: &FeatureConfig) -> f64 {
    let Some(centre) = mean(means) else {
        return 0.0;
    };
    let centred: Vec<f64> = means.iter().map(|m| m - centre).collect();
    let crossings = count_zero_crossings(&centred) as f64;
    let window_secs = means.len() as f64 * config.record_period_secs;
    let rate = (crossings / 2.0) * (60.0 / window_secs);
    rate.clamp(0.0, config.breathing_max_bpm)
}

/// Breathing series for the records of `topic`.
///
/// Emits at most `window_points` values. In windowed mode, each point is
/// stamped with the record that follows its window, so `breathing_window`
/// records or fewer yield an empty series. A window with any record lacking
/// a usable vector is skipped.
#[must_use]
pub fn breathing_rate_series(
    records: &[&CsiRecord],
    topic: Option<&str>,
    config: &FeatureConfig,
) -> BreathingSeries {
    let filtered = filter_by_topic(records.iter().copied(), topic);
    let recent = last_n(&filtered, config.window_points);

    if recent.iter().any(|r| r.breathing_rate.is_some()) {
        let points = recent
            .iter()
            .filter_map(|r| r.breathing_rate.map(|bpm| TimedValue::new(r.timestamp, bpm)))
            .collect();
        return BreathingSeries {
            mode: BreathingMode::Precomputed,
            points,
        };
    }

    BreathingSeries {
        mode: BreathingMode::Windowed,
        points: windowed_points(&filtered, config),
    }
}

fn windowed_points(filtered: &[&CsiRecord], config: &FeatureConfig) -> Vec<TimedValue> {
    let w = config.breathing_window;
    let input = last_n(filtered, config.window_points.saturating_add(w));
    if w == 0 || input.len() <= w {
        return Vec::new();
    }

    let scalars: Vec<Option<f64>> = input.iter().map(|r| mean(&r.subcarriers)).collect();

    // The window for position `i` is the `w` records strictly before it.
    (w..input.len())
        .filter_map(|i| {
            let means: Vec<f64> = scalars[i - w..i].iter().copied().collect::<Option<_>>()?;
            Some(TimedValue::new(
                input[i].timestamp,
                window_breathing_rate(&means, config),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn records_from_means(means: &[f64]) -> Vec<CsiRecord> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        means
            .iter()
            .enumerate()
            .map(|(i, &m)| CsiRecord::new(base + Duration::seconds(i as i64), None, vec![m, m]))
            .collect()
    }

    fn alternating(n: usize) -> Vec<f64> {
        (0..n).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect()
    }

    #[test]
    fn zero_crossings_alternating() {
        assert_eq!(count_zero_crossings(&alternating(10)), 9);
    }

    #[test]
    fn zero_crossings_constant() {
        assert_eq!(count_zero_crossings(&[1.0, 1.0, 1.0, 1.0]), 0);
        assert_eq!(count_zero_crossings(&[0.0, 0.0]), 0);
    }

    #[test]
    fn zero_crossings_through_exact_zero() {
        assert_eq!(count_zero_crossings(&[1.0, 0.0, -1.0]), 1);
        assert_eq!(count_zero_crossings(&[1.0, 0.0, 1.0]), 0);
        assert_eq!(count_zero_crossings(&[0.0, -1.0, 0.0, 2.0]), 1);
    }

    #[test]
    fn alternating_window_is_27_bpm() {
        let rate = window_breathing_rate(&alternating(10), &FeatureConfig::default());
        assert!((rate - 27.0).abs() < f64::EPSILON);
    }

    #[test]
    fn constant_window_is_zero_bpm() {
        let rate = window_breathing_rate(&[3.0; 10], &FeatureConfig::default());
        assert!(rate.abs() < f64::EPSILON);
    }

    #[test]
    fn rate_is_clamped_to_max() {
        let cfg = FeatureConfig {
            record_period_secs: 0.5,
            ..FeatureConfig::default()
        };
        let rate = window_breathing_rate(&alternating(10), &cfg);
        assert!((rate - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fewer_than_window_records_is_empty() {
        let recs = records_from_means(&alternating(9));
        let view: Vec<&CsiRecord> = recs.iter().collect();
        let series = breathing_rate_series(&view, None, &FeatureConfig::default());
        assert_eq!(series.mode, BreathingMode::Windowed);
        assert!(series.is_empty());
    }

    #[test]
    fn exactly_window_records_is_empty() {
        let recs = records_from_means(&alternating(10));
        let view: Vec<&CsiRecord> = recs.iter().collect();
        let series = breathing_rate_series(&view, None, &FeatureConfig::default());
        assert!(series.is_empty());
    }

    #[test]
    fn window_precedes_emitting_record() {
        // Records 0..=9 alternate; record 10 breaks the pattern but is not
        // part of its own window.
        let mut means = alternating(10);
        means.push(50.0);
        let recs = records_from_means(&means);
        let view: Vec<&CsiRecord> = recs.iter().collect();
        let series = breathing_rate_series(&view, None, &FeatureConfig::default());
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].timestamp, recs[10].timestamp);
        assert!((series.latest().unwrap() - 27.0).abs() < f64::EPSILON);
    }

    #[test]
    fn output_capped_at_window_points() {
        let recs = records_from_means(&alternating(100));
        let view: Vec<&CsiRecord> = recs.iter().collect();
        let series = breathing_rate_series(&view, None, &FeatureConfig::default());
        assert_eq!(series.points.len(), 50);
        assert_eq!(series.points[0].timestamp, recs[50].timestamp);
        assert_eq!(series.points[49].timestamp, recs[99].timestamp);
        assert!(series.points.iter().all(|p| (p.value - 27.0).abs() < f64::EPSILON));
    }

    #[test]
    fn window_with_empty_record_is_rejected() {
        let mut recs = records_from_means(&alternating(12));
        recs[0] = CsiRecord::new(recs[0].timestamp, None, Vec::new());
        let view: Vec<&CsiRecord> = recs.iter().collect();
        let series = breathing_rate_series(&view, None, &FeatureConfig::default());
        // Position 10 covers records 0..10 and is dropped; position 11 covers 1..11.
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].timestamp, recs[11].timestamp);
    }

    #[test]
    fn huge_window_points_does_not_overflow() {
        let cfg = FeatureConfig {
            window_points: usize::MAX,
            ..FeatureConfig::default()
        };
        let recs = records_from_means(&alternating(12));
        let view: Vec<&CsiRecord> = recs.iter().collect();
        assert_eq!(breathing_rate_series(&view, None, &cfg).points.len(), 2);
    }

    #[test]
    fn precomputed_field_bypasses_estimator() {
        let now = Utc::now();
        let recs = vec![
            CsiRecord::new(now, None, vec![1.0]).with_breathing_rate(14.0),
            CsiRecord::new(now, None, vec![1.0]),
            CsiRecord::new(now, None, Vec::new()).with_breathing_rate(16.5),
        ];
        let view: Vec<&CsiRecord> = recs.iter().collect();
        let series = breathing_rate_series(&view, None, &FeatureConfig::default());
        assert_eq!(series.mode, BreathingMode::Precomputed);
        let values: Vec<f64> = series.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![14.0, 16.5]);
    }
}
