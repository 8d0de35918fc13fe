//! Daemon settings: CLI flags with environment variable fallbacks.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use faascale_autoscale::config::DEFAULT_NAMESPACE;
use faascale_autoscale::{CapacityTarget, ConfigError, PredictiveConfig, ScalerConfig};
use faascale_core::parse_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "faascaled", about = "Autoscaler for OpenFaaS functions", version)]
pub struct Settings {
    /// Prometheus host queried for function metrics.
    #[arg(long, env = "faas_prometheus_host")]
    pub prometheus_host: String,

    #[arg(long, env = "faas_prometheus_port", default_value_t = 9090)]
    pub prometheus_port: u16,

    /// Gateway base URL, e.g. http://gateway:8080.
    #[arg(long, env = "gateway_address")]
    pub gateway_address: String,

    #[arg(long, env = "basic_auth_user")]
    pub basic_auth_user: Option<String>,

    #[arg(long, env = "basic_auth_password", hide_env_values = true)]
    pub basic_auth_password: Option<String>,

    /// Forecast service address. Enables predictive scaling.
    #[arg(long, env = "forecast_address")]
    pub forecast_address: Option<String>,

    #[arg(long, env = "function_namespace", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    #[arg(long, env = "discovery_interval", default_value = "30s", value_parser = duration)]
    pub discovery_interval: Duration,

    /// Reactive interval for functions without a ticker label.
    #[arg(long, env = "default_ticker", default_value = "5s", value_parser = duration)]
    pub default_ticker: Duration,

    /// How long a scale-down must persist before it is applied.
    #[arg(long, env = "decreasing_duration", default_value = "30s", value_parser = duration)]
    pub decreasing_duration: Duration,

    #[arg(long, env = "predict_interval", default_value = "1m", value_parser = duration)]
    pub predict_interval: Duration,

    #[arg(long, env = "predict_window", default_value_t = 10)]
    pub predict_window: usize,

    #[arg(long, env = "retrain_window", default_value_t = 60)]
    pub retrain_window: usize,

    #[arg(long, env = "mae_upper_limit", default_value_t = 10.0)]
    pub mae_upper_limit: f64,

    /// Fixed per-replica capacity for forecast decisions. Measured service
    /// rate when unset.
    #[arg(long, env = "predict_target_load")]
    pub predict_target_load: Option<f64>,

    /// Bound on every gateway, metrics and forecast call.
    #[arg(long, env = "network_timeout", default_value = "10s", value_parser = duration)]
    pub network_timeout: Duration,

    #[arg(long, env = "log_format", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

fn duration(s: &str) -> Result<Duration, String> {
    parse_duration(s).ok_or_else(|| format!("invalid duration {s:?}, expected e.g. 500ms, 30s, 5m"))
}

impl Settings {
    /// Engine configuration, validated.
    pub fn scaler_config(&self) -> Result<ScalerConfig, ConfigError> {
        let predictive = self.forecast_address.as_ref().map(|_| PredictiveConfig {
            interval: self.predict_interval,
            predict_window: self.predict_window,
            retrain_window: self.retrain_window,
            mae_upper_limit: self.mae_upper_limit,
            capacity: match self.predict_target_load {
                Some(load) => CapacityTarget::Fixed(load),
                None => CapacityTarget::ServiceRate,
            },
        });

        let config = ScalerConfig {
            namespace: self.namespace.clone(),
            discovery_interval: self.discovery_interval,
            default_reactive_interval: self.default_ticker,
            decreasing_duration: self.decreasing_duration,
            predictive,
        };
        config.validate()?;
        Ok(config)
    }

    /// Gateway credentials, when both halves are set.
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        match (&self.basic_auth_user, &self.basic_auth_password) {
            (Some(user), Some(password)) => Some((user, password)),
            _ => None,
        }
    }
}
