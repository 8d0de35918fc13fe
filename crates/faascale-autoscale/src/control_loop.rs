//! Per-function control loop.
//!
//! One task per function multiplexes its schedules through a single
//! `select!`:
//!
//! ```text
//!   reactive interval ──┐
//!   predict interval  ──┼──▶ select! ──▶ FunctionScaler
//!   shutdown (watch)  ──┘
//! ```
//!
//! The scaler state is owned by the loop, so ticks never overlap.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use faascale_core::{FunctionKey, ScaleError, ScalingMode};

use crate::predictive::PredictiveScaler;
use crate::reactive::{ReactiveScaler, ScaleDecision};

/// The scaler driven by a control loop.
pub enum FunctionScaler {
    Reactive(ReactiveScaler),
    Predictive(PredictiveScaler),
}

impl FunctionScaler {
    pub fn function(&self) -> &FunctionKey {
        match self {
            Self::Reactive(s) => s.function(),
            Self::Predictive(s) => s.function(),
        }
    }

    pub fn mode(&self) -> ScalingMode {
        match self {
            Self::Reactive(_) => ScalingMode::Reactive,
            Self::Predictive(s) => s.mode(),
        }
    }

    /// Reactive-schedule tick. `None` when the forecast path owns the
    /// replica count.
    async fn reactive_tick(&mut self) -> Option<Result<ScaleDecision, ScaleError>> {
        match self {
            Self::Reactive(s) => Some(s.tick().await),
            Self::Predictive(s) if s.mode() == ScalingMode::Predictive => None,
            Self::Predictive(s) => Some(s.reactive_mut().tick().await),
        }
    }

    async fn shutdown(&mut self) {
        match self {
            Self::Reactive(s) => s.shutdown().await,
            Self::Predictive(s) => s.shutdown().await,
        }
    }
}

/// Schedules and state of one function's autoscaling.
pub struct ControlLoop {
    scaler: FunctionScaler,
    reactive_interval: Duration,
    predict_interval: Option<Duration>,
}

impl ControlLoop {
    /// A loop that only runs reactive ticks.
    pub fn reactive(scaler: ReactiveScaler, interval: Duration) -> Self {
        Self {
            scaler: FunctionScaler::Reactive(scaler),
            reactive_interval: interval,
            predict_interval: None,
        }
    }

    /// A loop that also runs predictive ticks on `predict_interval`.
    pub fn predictive(
        scaler: PredictiveScaler,
        reactive_interval: Duration,
        predict_interval: Duration,
    ) -> Self {
        Self {
            scaler: FunctionScaler::Predictive(scaler),
            reactive_interval,
            predict_interval: Some(predict_interval),
        }
    }

    pub fn scaler(&self) -> &FunctionScaler {
        &self.scaler
    }

    /// Run until `shutdown` changes or its sender is dropped.
    ///
    /// Any pending scale-down is cancelled before this returns.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let function = self.scaler.function().clone();
        let mut reactive = ticker(self.reactive_interval);
        let mut predict = self.predict_interval.map(ticker);

        info!(
            %function,
            reactive_interval = ?self.reactive_interval,
            predict_interval = ?self.predict_interval,
            "control loop started"
        );

        loop {
            tokio::select! {
                _ = reactive.tick() => {
                    match self.scaler.reactive_tick().await {
                        Some(result) => report(&function, "reactive", result),
                        None => debug!(%function, "reactive tick skipped in predictive mode"),
                    }
                }
                _ = next_tick(&mut predict) => {
                    if let FunctionScaler::Predictive(s) = &mut self.scaler {
                        let result = s.tick().await;
                        report(&function, "predictive", result);
                    }
                }
                _ = shutdown.changed() => {
                    debug!(%function, "control loop shutting down");
                    break;
                }
            }
        }

        self.scaler.shutdown().await;
        info!(%function, "control loop stopped");
    }
}

/// Interval whose first tick is one period from now.
fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(i) => {
            i.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn report(function: &FunctionKey, schedule: &str, result: Result<ScaleDecision, ScaleError>) {
    match result {
        Ok(decision) => debug!(%function, schedule, ?decision, "tick complete"),
        Err(e) => warn!(%function, schedule, error = %e, "tick aborted"),
    }
}
