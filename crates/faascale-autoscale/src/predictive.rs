//! Predictive scaler — forecast-driven decisions with drift-based fallback.
//!
//! Every predictive tick turns the cumulative invocation counter into a
//! per-interval request delta and records it. Once enough history exists,
//! the mean absolute error between what was observed and what was
//! forecast decides the mode:
//!
//! ```text
//!              MAE > limit
//!  Predictive ─────────────▶ Reactive
//!      ▲                        │
//!      │  retrain loss <= limit │
//!      └────────────────────────┘
//! ```
//!
//! In reactive mode the wrapped [`ReactiveScaler`] decides and the model is
//! retrained on the long history window. In predictive mode the mean of
//! the forecast steps is converted to replicas and applied immediately,
//! without debounce.

use std::sync::Arc;

use tracing::{debug, info, warn};

use faascale_core::{
    ForecastClient, FunctionKey, GatewayClient, MetricsClient, ScaleError, ScaleResult,
    ScalingMode,
};

use crate::config::{CapacityTarget, PredictiveConfig};
use crate::policy::compute_target;
use crate::queries;
use crate::reactive::{ReactiveScaler, ScaleDecision};
use crate::window::{BoundedWindow, mean_absolute_error};

/// Counters sampled at the start of a predictive tick.
#[derive(Debug, Clone, Copy)]
struct CounterSample {
    invocations: f64,
    duration_sum: f64,
    successes: f64,
}

/// Reactive scaler extended with forecasting and mode switching.
pub struct PredictiveScaler {
    reactive: ReactiveScaler,
    gateway: Arc<dyn GatewayClient>,
    metrics: Arc<dyn MetricsClient>,
    forecast: Arc<dyn ForecastClient>,
    config: PredictiveConfig,
    mode: ScalingMode,
    last_cumulative_counter: Option<f64>,
    /// Recent request deltas: forecast input and drift baseline.
    normal_window: BoundedWindow,
    /// Longer delta history submitted for retraining.
    update_window: BoundedWindow,
    /// First-step forecasts, aligned with `normal_window`.
    predicted_window: BoundedWindow,
}

impl PredictiveScaler {
    pub fn new(
        reactive: ReactiveScaler,
        gateway: Arc<dyn GatewayClient>,
        metrics: Arc<dyn MetricsClient>,
        forecast: Arc<dyn ForecastClient>,
        config: PredictiveConfig,
    ) -> Self {
        Self {
            reactive,
            gateway,
            metrics,
            forecast,
            normal_window: BoundedWindow::new(config.predict_window),
            update_window: BoundedWindow::new(config.retrain_window),
            predicted_window: BoundedWindow::new(config.predict_window),
            config,
            mode: ScalingMode::Reactive,
            last_cumulative_counter: None,
        }
    }

    pub fn function(&self) -> &FunctionKey {
        self.reactive.function()
    }

    pub fn mode(&self) -> ScalingMode {
        self.mode
    }

    pub fn reactive(&self) -> &ReactiveScaler {
        &self.reactive
    }

    /// The wrapped reactive scaler, for reactive-schedule ticks.
    pub fn reactive_mut(&mut self) -> &mut ReactiveScaler {
        &mut self.reactive
    }

    /// Run one predictive tick.
    ///
    /// Any failure aborts the tick; the mode and the windows keep whatever
    /// they held before the failing step.
    pub async fn tick(&mut self) -> ScaleResult<ScaleDecision> {
        let sample = self.sample_counters().await?;

        let Some(last) = self.last_cumulative_counter.replace(sample.invocations) else {
            debug!(
                function = %self.function(),
                counter = sample.invocations,
                "invocation counter baseline recorded"
            );
            return Ok(ScaleDecision::NoChange);
        };
        // A counter below its last value was reset; count from zero.
        let delta = if sample.invocations >= last {
            sample.invocations - last
        } else {
            sample.invocations
        };
        self.normal_window.enqueue(delta);
        self.update_window.enqueue(delta);

        let request_rate = delta / (self.config.interval.as_secs_f64() / 60.0);
        let service_rate = sample.successes / (sample.duration_sum / 60.0);
        info!(
            function = %self.function(),
            request_rate,
            service_rate,
            "request rate and service rate (per minute)"
        );

        self.evaluate_mode().await;

        match self.mode {
            ScalingMode::Reactive => self.reactive_step().await,
            ScalingMode::Predictive => self.predictive_step(service_rate).await,
        }
    }

    /// Stop any pending reactive scale-down and wait for in-flight writes.
    pub async fn shutdown(&mut self) {
        self.reactive.shutdown().await;
    }

    async fn sample_counters(&self) -> ScaleResult<CounterSample> {
        let f = self.reactive.function();
        let invocations = self
            .metrics
            .fetch(&queries::invocations_total(&f.name, &f.namespace))
            .await?
            .value;
        let duration_sum = self
            .metrics
            .fetch(&queries::request_duration_sum(&f.name))
            .await?
            .value;
        let successes = self
            .metrics
            .fetch(&queries::success_total(&f.name, &f.namespace))
            .await?
            .value;
        Ok(CounterSample {
            invocations,
            duration_sum,
            successes,
        })
    }

    /// Pick the mode from the drift between observed and forecast deltas.
    async fn evaluate_mode(&mut self) {
        if !self.normal_window.is_full() {
            return;
        }
        if !self.predicted_window.is_full() {
            // No drift evidence yet.
            self.set_mode(ScalingMode::Predictive).await;
            return;
        }

        let mae = mean_absolute_error(&self.normal_window, &self.predicted_window).unwrap_or(0.0);
        let limit = self.config.mae_upper_limit;
        if mae > limit {
            if self.mode == ScalingMode::Predictive {
                warn!(function = %self.function(), mae, limit, "forecast drift above limit");
            }
            self.set_mode(ScalingMode::Reactive).await;
        } else {
            debug!(function = %self.function(), mae, limit, "forecast within drift limit");
            self.set_mode(ScalingMode::Predictive).await;
        }
    }

    async fn set_mode(&mut self, mode: ScalingMode) {
        if mode == self.mode {
            return;
        }
        info!(function = %self.function(), from = %self.mode, to = %mode, "scaling mode changed");
        if mode == ScalingMode::Predictive {
            // Forecast decisions own the replica count from here on.
            self.reactive.cancel_pending().await;
        }
        self.mode = mode;
    }

    async fn reactive_step(&mut self) -> ScaleResult<ScaleDecision> {
        let decision = self.reactive.tick().await?;

        if self.update_window.is_full() {
            let history = self.update_window.values();
            let loss = self.forecast.update_model(&history).await?;
            let limit = self.config.mae_upper_limit;
            info!(function = %self.function(), loss, limit, "forecast model retrained");
            if loss <= limit {
                // Predictions of the replaced model say nothing about the new one.
                self.predicted_window.clear();
                self.set_mode(ScalingMode::Predictive).await;
            }
        }
        Ok(decision)
    }

    async fn predictive_step(&mut self, service_rate: f64) -> ScaleResult<ScaleDecision> {
        let window = self.normal_window.values();
        debug!(function = %self.function(), ?window, "forecast input");

        let forecast = self.forecast.predict(&window).await?;
        let Some(&first) = forecast.first() else {
            return Err(ScaleError::Forecast(format!(
                "empty forecast for {}",
                self.function()
            )));
        };
        self.predicted_window.enqueue(first);
        let next_load = forecast.iter().sum::<f64>() / forecast.len() as f64;
        debug!(function = %self.function(), ?forecast, next_load, "forecast received");

        let f = self.reactive.function().clone();
        let snapshot = self.gateway.get_replicas(&f.name, &f.namespace).await?;

        let capacity = match self.config.capacity {
            CapacityTarget::ServiceRate => service_rate,
            CapacityTarget::Fixed(target) => target,
        };
        if !(capacity.is_finite() && capacity > 0.0) {
            warn!(function = %f, capacity, "no usable per-replica capacity, skipping forecast decision");
            return Ok(ScaleDecision::NoChange);
        }

        let target = compute_target(
            next_load,
            capacity,
            snapshot.min_replicas,
            snapshot.max_replicas,
        );
        if target == snapshot.replicas {
            return Ok(ScaleDecision::NoChange);
        }

        self.gateway
            .set_replicas(&f.name, &f.namespace, target)
            .await?;
        info!(
            function = %f,
            from = snapshot.replicas,
            to = target,
            next_load,
            capacity,
            "scaled on forecast"
        );
        Ok(ScaleDecision::ScaleTo(target))
    }
}
