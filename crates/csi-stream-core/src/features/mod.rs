//! Real-time features derived from the rolling buffer.
//!
//! Four independent extractors, each a pure function of a topic-filtered
//! record view:
//!
//! - [`amplitude`]: latest per-subcarrier amplitude vector
//! - [`timeseries`]: one subcarrier over time
//! - [`motion`]: variance-threshold motion indicator
//! - [`breathing`]: windowed zero-crossing breathing rate, or the device's
//!   own estimate when records carry one
//!
//! Re-running an extractor on an unchanged view yields identical output.

pub mod amplitude;
pub mod breathing;
pub mod motion;
pub mod timeseries;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::CsiRecord;

pub use amplitude::{amplitude_snapshot, AmplitudeSnapshot};
pub use breathing::{
    breathing_rate_series, count_zero_crossings, window_breathing_rate, BreathingMode,
    BreathingSeries,
};
pub use motion::{detect_motion, MotionPoint};
pub use timeseries::{subcarrier_trace, SubcarrierTrace};

/// Tunable extractor parameters.
///
/// `motion_threshold` and the zero-crossing rule are uncalibrated
/// placeholders; there is no per-device noise-floor estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Maximum points emitted per series (`D`).
    pub window_points: usize,
    /// Variance above which a record counts as motion.
    pub motion_threshold: f64,
    /// Records per breathing estimation window (`W`).
    pub breathing_window: usize,
    /// Upper clamp for the windowed breathing rate (BPM).
    pub breathing_max_bpm: f64,
    /// Nominal time between records in seconds.
    pub record_period_secs: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window_points: 50,
            motion_threshold: 0.5,
            breathing_window: 10,
            breathing_max_bpm: 30.0,
            record_period_secs: 1.0,
        }
    }
}

impl FeatureConfig {
    /// Check every parameter is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_points == 0 {
            return Err(ConfigError::invalid_value("window_points", "must be > 0"));
        }
        if !self.motion_threshold.is_finite() || self.motion_threshold < 0.0 {
            return Err(ConfigError::invalid_value(
                "motion_threshold",
                "must be a finite value >= 0",
            ));
        }
        if self.breathing_window < 2 {
            return Err(ConfigError::invalid_value("breathing_window", "must be >= 2"));
        }
        if !self.breathing_max_bpm.is_finite() || self.breathing_max_bpm <= 0.0 {
            return Err(ConfigError::invalid_value(
                "breathing_max_bpm",
                "must be a finite value > 0",
            ));
        }
        if !self.record_period_secs.is_finite() || self.record_period_secs <= 0.0 {
            return Err(ConfigError::invalid_value(
                "record_period_secs",
                "must be a finite value > 0",
            ));
        }
        Ok(())
    }
}

/// Presentation-side selection that parameterises an extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    /// Topic to visualise; `None` means all topics.
    pub topic: Option<String>,
    /// Subcarrier index for the time-series trace.
    pub subcarrier: usize,
}

impl ViewState {
    /// View of a single topic.
    #[must_use]
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            subcarrier: 0,
        }
    }

    /// Topic filter as a borrowed option.
    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }
}

/// Whether a subcarrier vector carries anything an extractor can use.
#[must_use]
pub fn has_usable_data(values: &[f64]) -> bool {
    !values.is_empty()
}

/// Arithmetic mean, or `None` for an unusable vector.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if !has_usable_data(values) {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance (mean squared deviation), or `None` for an unusable vector.
#[must_use]
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64)
}

/// All four features computed from one consistent view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSnapshot {
    /// Buffer revision the snapshot was computed from.
    pub revision: u64,
    /// Topic the view was filtered to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Latest amplitude vector.
    pub amplitude: Option<AmplitudeSnapshot>,
    /// Selected subcarrier over time.
    pub timeseries: SubcarrierTrace,
    /// Motion indicator series.
    pub motion: Vec<MotionPoint>,
    /// Breathing rate series.
    pub breathing: BreathingSeries,
}

/// Run every extractor over `records` for the given view.
#[must_use]
pub fn extract_all(
    records: &[&CsiRecord],
    view: &ViewState,
    config: &FeatureConfig,
    revision: u64,
) -> FeatureSnapshot {
    FeatureSnapshot {
        revision,
        topic: view.topic.clone(),
        amplitude: amplitude_snapshot(records, view.topic()),
        timeseries: subcarrier_trace(records, view.topic(), view.subcarrier, config),
        motion: detect_motion(records, view.topic(), config),
        breathing: breathing_rate_series(records, view.topic(), config),
    }
}
