//! Engine configuration.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_NAMESPACE: &str = "openfaas-fn";
pub const DEFAULT_DISCOVERY_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_REACTIVE_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_DECREASING_DURATION: Duration = Duration::from_secs(30);
pub const DEFAULT_PREDICT_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_PREDICT_WINDOW: usize = 10;
pub const DEFAULT_RETRAIN_WINDOW: usize = 60;
pub const DEFAULT_MAE_UPPER_LIMIT: f64 = 10.0;

/// Invalid engine settings, rejected before any loop starts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("{0} window must hold at least one sample")]
    EmptyWindow(&'static str),

    #[error("{name} must be a positive finite number, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("namespace must not be empty")]
    EmptyNamespace,
}

/// Capacity per replica used by predictive decisions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CapacityTarget {
    /// Measured service rate (successful requests per minute of serving time).
    #[default]
    ServiceRate,
    /// Fixed per-replica load, independent of the reactive target load.
    Fixed(f64),
}

/// Settings for the forecast-driven mode.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictiveConfig {
    pub interval: Duration,
    /// Capacity of the forecast input and drift-comparison windows.
    pub predict_window: usize,
    /// Capacity of the history window submitted for retraining.
    pub retrain_window: usize,
    /// Drift above this MAE forces reactive mode; a retrain loss at or
    /// below it restores predictive mode.
    pub mae_upper_limit: f64,
    pub capacity: CapacityTarget,
}

impl Default for PredictiveConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PREDICT_INTERVAL,
            predict_window: DEFAULT_PREDICT_WINDOW,
            retrain_window: DEFAULT_RETRAIN_WINDOW,
            mae_upper_limit: DEFAULT_MAE_UPPER_LIMIT,
            capacity: CapacityTarget::ServiceRate,
        }
    }
}

/// Process-wide autoscaler settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalerConfig {
    /// Namespace whose functions are discovered and scaled.
    pub namespace: String,
    pub discovery_interval: Duration,
    /// Reactive interval for functions without a ticker label.
    pub default_reactive_interval: Duration,
    /// How long a shrink must persist before it is applied.
    pub decreasing_duration: Duration,
    /// Enables predictive mode when set.
    pub predictive: Option<PredictiveConfig>,
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            discovery_interval: DEFAULT_DISCOVERY_INTERVAL,
            default_reactive_interval: DEFAULT_REACTIVE_INTERVAL,
            decreasing_duration: DEFAULT_DECREASING_DURATION,
            predictive: None,
        }
    }
}

impl ScalerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if self.discovery_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("discovery interval"));
        }
        if self.default_reactive_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("reactive interval"));
        }

        let Some(p) = &self.predictive else {
            return Ok(());
        };
        if p.interval.is_zero() {
            return Err(ConfigError::ZeroDuration("predict interval"));
        }
        if p.predict_window == 0 {
            return Err(ConfigError::EmptyWindow("predict"));
        }
        if p.retrain_window == 0 {
            return Err(ConfigError::EmptyWindow("retrain"));
        }
        if !(p.mae_upper_limit.is_finite() && p.mae_upper_limit > 0.0) {
            return Err(ConfigError::NotPositive {
                name: "MAE upper limit",
                value: p.mae_upper_limit,
            });
        }
        if let CapacityTarget::Fixed(t) = p.capacity
            && !(t.is_finite() && t > 0.0)
        {
            return Err(ConfigError::NotPositive {
                name: "predictive target load",
                value: t,
            });
        }
        Ok(())
    }
}
