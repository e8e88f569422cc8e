//! Engine configuration.
//!
//! [`EngineConfig`] bundles buffer sizing, normalizer field names and
//! extractor parameters. It round-trips through pretty-printed JSON, and
//! every field has a default so partial files are accepted.
//!
//! # Example
//!
//! ```rust
//! use csi_stream_core::config::EngineConfig;
//!
//! let cfg = EngineConfig::default();
//! cfg.validate().expect("default config must be valid");
//! assert_eq!(cfg.buffer_capacity, 100);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buffer::DEFAULT_CAPACITY;
use crate::error::ConfigError;
use crate::features::FeatureConfig;
use crate::normalizer::NormalizerConfig;

/// Subscription pattern meaning "every topic".
pub const MATCH_ALL_TOPICS: &str = "#";

/// Complete configuration for a stream controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rolling buffer capacity `C`.
    pub buffer_capacity: usize,
    /// Field names probed when decoding raw records.
    pub normalizer: NormalizerConfig,
    /// Extractor parameters.
    pub features: FeatureConfig,
    /// Topic subscription pattern requested at startup.
    pub default_topic_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_CAPACITY,
            normalizer: NormalizerConfig::default(),
            features: FeatureConfig::default(),
            default_topic_filter: MATCH_ALL_TOPICS.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileAccess`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid JSON for this schema, or any
    /// error from [`validate`](Self::validate).
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: EngineConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Write this configuration as pretty-printed JSON, creating parent
    /// directories if necessary.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileAccess`] if the directory or file cannot be written.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileAccess {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("(serialization)", e.to_string()))?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Check every field is in range.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::invalid_value("buffer_capacity", "must be > 0"));
        }
        if self.normalizer.positional_fields.is_empty()
            && self.normalizer.delimited_fields.is_empty()
            && self.normalizer.indexed_field.is_empty()
            && !self.normalizer.fallback_scan
        {
            return Err(ConfigError::invalid_value(
                "normalizer",
                "at least one decode shape must be enabled",
            ));
        }
        self.features.validate()?;
        let needed = self
            .features
            .window_points
            .saturating_add(self.features.breathing_window);
        if needed > self.buffer_capacity {
            tracing::warn!(
                capacity = self.buffer_capacity,
                needed,
                "buffer smaller than the breathing input window; early points will be missing"
            );
        }
        Ok(())
    }
}
