//! Scaling labels recognised on a function.
//!
//! Label values are user-supplied strings. A missing or malformed value is
//! never an error: the documented default is used instead and the caller
//! can tell from `LabelValue::source` whether that happened.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, warn};

/// Reactive polling interval override, in whole seconds.
pub const TICKER_LABEL: &str = "com.openfaas.scale.ticker";
pub const MIN_SCALE_LABEL: &str = "com.openfaas.scale.min";
pub const MAX_SCALE_LABEL: &str = "com.openfaas.scale.max";
pub const SCALING_FACTOR_LABEL: &str = "com.openfaas.scale.factor";
pub const TARGET_LOAD_LABEL: &str = "com.openfaas.scale.target";

pub const DEFAULT_MIN_REPLICAS: u32 = 1;
pub const DEFAULT_MAX_REPLICAS: u32 = 20;
pub const DEFAULT_SCALING_FACTOR: u32 = 10;
pub const DEFAULT_TARGET_LOAD: f64 = 10.0;

/// Where a label-derived value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    /// Parsed from the label.
    Label,
    /// Label not set; default used.
    Absent,
    /// Label set but unparsable or out of range; default used.
    Invalid,
}

/// A value resolved from a label, with its provenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelValue<T> {
    pub value: T,
    pub source: LabelSource,
}

impl<T> LabelValue<T> {
    /// Whether the fallback was used instead of the label.
    pub fn defaulted(&self) -> bool {
        self.source != LabelSource::Label
    }
}

/// Parse `key` from `labels`, falling back to `fallback` when the label is
/// absent or fails to parse.
pub fn parse_label<T>(labels: &HashMap<String, String>, key: &str, fallback: T) -> LabelValue<T>
where
    T: FromStr,
{
    parse_label_where(labels, key, fallback, |_| true)
}

/// Like [`parse_label`], but also rejects parsed values failing `valid`.
pub fn parse_label_where<T, F>(
    labels: &HashMap<String, String>,
    key: &str,
    fallback: T,
    valid: F,
) -> LabelValue<T>
where
    T: FromStr,
    F: Fn(&T) -> bool,
{
    let raw = match labels.get(key).map(|v| v.trim()) {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            return LabelValue {
                value: fallback,
                source: LabelSource::Absent,
            };
        }
    };

    match raw.parse::<T>() {
        Ok(value) if valid(&value) => LabelValue {
            value,
            source: LabelSource::Label,
        },
        _ => {
            warn!(label = key, value = raw, "invalid label value, using default");
            LabelValue {
                value: fallback,
                source: LabelSource::Invalid,
            }
        }
    }
}

/// Scaling bounds and targets resolved from a function's labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingLabels {
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub scaling_factor: u32,
    pub target_load: f64,
}

impl Default for ScalingLabels {
    fn default() -> Self {
        Self {
            min_replicas: DEFAULT_MIN_REPLICAS,
            max_replicas: DEFAULT_MAX_REPLICAS,
            scaling_factor: DEFAULT_SCALING_FACTOR,
            target_load: DEFAULT_TARGET_LOAD,
        }
    }
}

impl ScalingLabels {
    pub fn from_labels(labels: &HashMap<String, String>) -> Self {
        let min = parse_label(labels, MIN_SCALE_LABEL, DEFAULT_MIN_REPLICAS);
        let max = parse_label(labels, MAX_SCALE_LABEL, DEFAULT_MAX_REPLICAS);
        let factor = parse_label_where(
            labels,
            SCALING_FACTOR_LABEL,
            DEFAULT_SCALING_FACTOR,
            |f| *f <= 100,
        );
        let target = parse_label_where(labels, TARGET_LOAD_LABEL, DEFAULT_TARGET_LOAD, |t: &f64| {
            t.is_finite() && *t > 0.0
        });

        if min.value > max.value {
            warn!(
                min = min.value,
                max = max.value,
                "min replicas above max replicas, min takes precedence"
            );
        }

        Self {
            min_replicas: min.value,
            max_replicas: max.value,
            scaling_factor: factor.value,
            target_load: target.value,
        }
    }
}

/// Resolve the reactive polling interval from the ticker label.
pub fn ticker_interval(labels: &HashMap<String, String>, fallback: Duration) -> LabelValue<Duration> {
    let secs = parse_label_where(labels, TICKER_LABEL, 0u64, |s| *s > 0);
    match secs.source {
        LabelSource::Label => LabelValue {
            value: Duration::from_secs(secs.value),
            source: LabelSource::Label,
        },
        source => {
            debug!(label = TICKER_LABEL, ?fallback, "using default ticker interval");
            LabelValue {
                value: fallback,
                source,
            }
        }
    }
}
