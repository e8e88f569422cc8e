//! Raw record normalization.
//!
//! Upstream devices publish CSI in several layouts. The normalizer decodes a
//! raw JSON object into a [`CsiRecord`] by trying an ordered list of
//! [`ShapeMatcher`]s:
//!
//! 1. [`PositionalMatcher`]: `"CSIs": [12, "13.5", ...]`
//! 2. [`IndexedMatcher`]: `"subcarriers": [{"index": 3, "amplitude": 1.2, "phase": 0.4}, ...]`
//! 3. [`DelimitedMatcher`]: `"raw_payload": "12, 13.5, 9"`
//! 4. [`FallbackMatcher`]: first array field holding any nonzero value
//!
//! A record none of them matches keeps an empty subcarrier vector. Every
//! value goes through [`coerce_value`], so the output never contains NaN.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::NormalizeError;
use crate::types::{CsiRecord, Passthrough, RecordShape};

/// Epoch values above this are interpreted as milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;

// ── Configuration ──────────────────────────────────────────────────────────

/// Field names probed by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Fields holding positional amplitude arrays, in priority order.
    pub positional_fields: Vec<String>,
    /// Field holding `{index, amplitude}` entries.
    pub indexed_field: String,
    /// Fields holding comma-separated amplitude strings, in priority order.
    pub delimited_fields: Vec<String>,
    /// Entries with an explicit index above this are dropped.
    pub max_subcarrier_index: usize,
    /// Whether to scan all fields when no named shape matches.
    pub fallback_scan: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            positional_fields: vec!["CSIs".to_string()],
            indexed_field: "subcarriers".to_string(),
            delimited_fields: vec!["raw_payload".to_string(), "csi".to_string()],
            max_subcarrier_index: 4095,
            fallback_scan: true,
        }
    }
}

// ── Value coercion ─────────────────────────────────────────────────────────

/// Coerce one JSON value to a finite `f64`.
///
/// Numbers pass through, strings are parsed as floats, and anything else
/// (or any parse failure or non-finite result) becomes `0.0`.
#[must_use]
pub fn coerce_value(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => coerce_str(s),
        _ => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

fn coerce_str(s: &str) -> f64 {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

fn coerce_array(items: &[Value]) -> Vec<f64> {
    items.iter().map(coerce_value).collect()
}

/// JSON kind name used in error messages.
fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Shape matchers ─────────────────────────────────────────────────────────

/// One candidate layout for the subcarrier vector.
///
/// `try_match` returns `None` when the layout is not present so the
/// normalizer can move on to the next matcher.
pub trait ShapeMatcher: Send + Sync {
    /// Shape reported for records this matcher decodes.
    fn shape(&self) -> RecordShape;

    /// Attempt to decode the amplitude vector from the record's fields.
    fn try_match(&self, fields: &Map<String, Value>) -> Option<Vec<f64>>;
}

/// Positional numeric (or numeric-string) arrays.
#[derive(Debug, Clone)]
pub struct PositionalMatcher {
    fields: Vec<String>,
}

impl PositionalMatcher {
    /// Probe `fields` in order.
    #[must_use]
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

impl ShapeMatcher for PositionalMatcher {
    fn shape(&self) -> RecordShape {
        RecordShape::Positional
    }

    fn try_match(&self, fields: &Map<String, Value>) -> Option<Vec<f64>> {
        self.fields.iter().find_map(|name| match fields.get(name) {
            Some(Value::Array(items)) if !items.is_empty() => Some(coerce_array(items)),
            _ => None,
        })
    }
}

/// Arrays of `{index, amplitude}` objects placed by their explicit index.
#[derive(Debug, Clone)]
pub struct IndexedMatcher {
    field: String,
    max_index: usize,
}

impl IndexedMatcher {
    /// Probe `field`, dropping entries indexed above `max_index`.
    #[must_use]
    pub fn new(field: impl Into<String>, max_index: usize) -> Self {
        Self {
            field: field.into(),
            max_index,
        }
    }
}

/// Resolve an explicit subcarrier index, if it is a non-negative integer.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn explicit_index(value: Option<&Value>) -> Option<usize> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|i| usize::try_from(i).ok()).or_else(|| {
            let f = n.as_f64()?;
            (f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64).then_some(f as usize)
        }),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }
}

impl ShapeMatcher for IndexedMatcher {
    fn shape(&self) -> RecordShape {
        RecordShape::Indexed
    }

    fn try_match(&self, fields: &Map<String, Value>) -> Option<Vec<f64>> {
        let Some(Value::Array(items)) = fields.get(&self.field) else {
            return None;
        };

        let placed: Vec<(usize, f64)> = items
            .iter()
            .enumerate()
            .filter_map(|(position, item)| {
                let entry = item.as_object()?;
                // Position only stands in for a missing index; a malformed or
                // negative one drops the entry.
                let index = match entry.get("index") {
                    None | Some(Value::Null) => position,
                    Some(raw) => explicit_index(Some(raw))?,
                };
                if index > self.max_index {
                    return None;
                }
                let amplitude = entry.get("amplitude").map_or(0.0, coerce_value);
                Some((index, amplitude))
            })
            .collect();

        let len = placed.iter().map(|&(i, _)| i + 1).max()?;
        let mut values = vec![0.0; len];
        for (index, amplitude) in placed {
            values[index] = amplitude;
        }
        Some(values)
    }
}

/// Comma-separated numeric strings, e.g. `"12, 13.5, 9"` or `"[12,13.5,9]"`.
#[derive(Debug, Clone)]
pub struct DelimitedMatcher {
    fields: Vec<String>,
}

impl DelimitedMatcher {
    /// Probe `fields` in order.
    #[must_use]
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

/// Split a delimited payload into coerced values.
#[must_use]
pub fn parse_delimited(payload: &str) -> Vec<f64> {
    payload
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(coerce_str)
        .collect()
}

impl ShapeMatcher for DelimitedMatcher {
    fn shape(&self) -> RecordShape {
        RecordShape::Delimited
    }

    fn try_match(&self, fields: &Map<String, Value>) -> Option<Vec<f64>> {
        self.fields.iter().find_map(|name| match fields.get(name) {
            Some(Value::String(payload)) => {
                let values = parse_delimited(payload);
                (!values.is_empty()).then_some(values)
            }
            _ => None,
        })
    }
}

/// Heuristic scan for the first array field with a nonzero value.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackMatcher;

impl ShapeMatcher for FallbackMatcher {
    fn shape(&self) -> RecordShape {
        RecordShape::Fallback
    }

    fn try_match(&self, fields: &Map<String, Value>) -> Option<Vec<f64>> {
        fields.values().find_map(|value| match value {
            Value::Array(items) if !items.is_empty() => {
                let values = coerce_array(items);
                values.iter().any(|&v| v != 0.0).then_some(values)
            }
            _ => None,
        })
    }
}

// ── Normalizer ─────────────────────────────────────────────────────────────

/// Decodes raw JSON records into [`CsiRecord`]s.
pub struct Normalizer {
    matchers: Vec<Box<dyn ShapeMatcher>>,
}

impl Normalizer {
    /// Build the matcher chain for `config`.
    #[must_use]
    pub fn new(config: &NormalizerConfig) -> Self {
        let mut matchers: Vec<Box<dyn ShapeMatcher>> = vec![
            Box::new(PositionalMatcher::new(config.positional_fields.clone())),
            Box::new(IndexedMatcher::new(
                config.indexed_field.clone(),
                config.max_subcarrier_index,
            )),
            Box::new(DelimitedMatcher::new(config.delimited_fields.clone())),
        ];
        if config.fallback_scan {
            matchers.push(Box::new(FallbackMatcher));
        }
        Self { matchers }
    }

    /// Build a normalizer from an explicit matcher chain.
    #[must_use]
    pub fn with_matchers(matchers: Vec<Box<dyn ShapeMatcher>>) -> Self {
        Self { matchers }
    }

    /// Number of matchers in the chain.
    #[must_use]
    pub fn matcher_count(&self) -> usize {
        self.matchers.len()
    }

    /// Normalize `raw`, stamping it with the current time if it has none.
    pub fn normalize(&self, raw: &Value) -> Result<CsiRecord, NormalizeError> {
        self.normalize_at(raw, Utc::now())
    }

    /// Normalize `raw`, using `received_at` when it carries no timestamp.
    pub fn normalize_at(
        &self,
        raw: &Value,
        received_at: DateTime<Utc>,
    ) -> Result<CsiRecord, NormalizeError> {
        let fields = raw.as_object().ok_or(NormalizeError::NotAnObject {
            kind: kind_of(raw),
        })?;

        let (shape, subcarriers) = self.decode(fields);

        Ok(CsiRecord {
            timestamp: fields
                .get("timestamp")
                .and_then(parse_timestamp)
                .unwrap_or(received_at),
            topic: string_field(fields, "topic"),
            device_id: string_field(fields, "device_id")
                .or_else(|| string_field(fields, "deviceId")),
            subcarriers,
            breathing_rate: number_field(fields, "breathing_rate"),
            passthrough: Passthrough {
                rssi: number_field(fields, "rssi"),
                snr: number_field(fields, "snr"),
                temperature: number_field(fields, "temperature"),
                humidity: number_field(fields, "humidity"),
                signal_quality: string_field(fields, "signal_quality"),
            },
            shape,
        })
    }

    /// Run the matcher chain over a record's fields.
    pub fn decode(&self, fields: &Map<String, Value>) -> (RecordShape, Vec<f64>) {
        self.matchers
            .iter()
            .find_map(|m| m.try_match(fields).map(|values| (m.shape(), values)))
            .unwrap_or((RecordShape::Empty, Vec::new()))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shapes: Vec<RecordShape> = self.matchers.iter().map(|m| m.shape()).collect();
        f.debug_struct("Normalizer").field("matchers", &shapes).finish()
    }
}

// ── Metadata helpers ───────────────────────────────────────────────────────

fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_field(fields: &Map<String, Value>, name: &str) -> Option<f64> {
    match fields.get(name)? {
        Value::Null => None,
        other => Some(coerce_value(other)),
    }
}

/// Parse RFC 3339, naive ISO-8601 (assumed UTC), or numeric epoch timestamps.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
        }
        Value::Number(n) => {
            let epoch = n.as_f64().filter(|v| v.is_finite() && *v >= 0.0)?;
            if epoch > EPOCH_MILLIS_THRESHOLD {
                DateTime::from_timestamp_millis(epoch as i64)
            } else {
                let secs = epoch.trunc() as i64;
                let nanos = (epoch.fract() * 1e9) as u32;
                DateTime::from_timestamp(secs, nanos)
            }
        }
        _ => None,
    }
}
