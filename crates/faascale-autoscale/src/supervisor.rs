//! Discovery supervisor — keeps one control loop per deployed function.
//!
//! Every discovery interval the gateway is asked for the functions in the
//! configured namespace and the registry is reconciled against the answer:
//!
//! ```text
//!  list_functions ──▶ new name?      ──▶ spawn ControlLoop, register slot
//!                 ──▶ vanished name? ──▶ signal shutdown, deregister
//! ```
//!
//! A failed listing skips the pass. Nothing is removed on a failure, so a
//! flapping gateway never tears loops down.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use faascale_core::labels::ticker_interval;
use faascale_core::{
    ForecastClient, FunctionDescriptor, GatewayClient, MetricsClient, ScaleResult,
};

use crate::config::ScalerConfig;
use crate::control_loop::ControlLoop;
use crate::predictive::PredictiveScaler;
use crate::reactive::ReactiveScaler;

/// A running control loop.
struct LoopSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// What a discovery pass changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub started: Vec<String>,
    pub stopped: Vec<String>,
}

/// Owns the registry of per-function control loops.
pub struct Supervisor {
    gateway: Arc<dyn GatewayClient>,
    metrics: Arc<dyn MetricsClient>,
    forecast: Option<Arc<dyn ForecastClient>>,
    config: ScalerConfig,
    /// Active loops: function name → slot.
    registry: HashMap<String, LoopSlot>,
}

impl Supervisor {
    pub fn new(
        gateway: Arc<dyn GatewayClient>,
        metrics: Arc<dyn MetricsClient>,
        config: ScalerConfig,
    ) -> Self {
        Self {
            gateway,
            metrics,
            forecast: None,
            config,
            registry: HashMap::new(),
        }
    }

    /// Enable predictive loops. Only takes effect when the config carries
    /// predictive settings.
    pub fn with_forecast(mut self, forecast: Arc<dyn ForecastClient>) -> Self {
        self.forecast = Some(forecast);
        self
    }

    /// Run one discovery pass.
    pub async fn reconcile(&mut self) -> ScaleResult<Reconciled> {
        let functions = self.gateway.list_functions(&self.config.namespace).await?;
        let listed: HashSet<&str> = functions.iter().map(|f| f.name.as_str()).collect();
        let mut report = Reconciled::default();

        let vanished: Vec<String> = self
            .registry
            .keys()
            .filter(|name| !listed.contains(name.as_str()))
            .cloned()
            .collect();
        for name in vanished {
            if let Some(slot) = self.registry.remove(&name) {
                let _ = slot.shutdown_tx.send(true);
                info!(function = %name, "function removed, control loop stopped");
                report.stopped.push(name);
            }
        }

        for function in &functions {
            if self.registry.contains_key(&function.name) {
                continue;
            }
            self.start(function);
            report.started.push(function.name.clone());
        }

        debug!(
            namespace = %self.config.namespace,
            functions = functions.len(),
            started = report.started.len(),
            stopped = report.stopped.len(),
            "discovery pass complete"
        );
        Ok(report)
    }

    fn start(&mut self, function: &FunctionDescriptor) {
        let interval = ticker_interval(&function.labels, self.config.default_reactive_interval);

        let reactive = ReactiveScaler::new(
            function.key(),
            Arc::clone(&self.gateway),
            Arc::clone(&self.metrics),
            self.config.decreasing_duration,
        );
        let control = match (&self.forecast, &self.config.predictive) {
            (Some(forecast), Some(predictive)) => {
                let scaler = PredictiveScaler::new(
                    reactive,
                    Arc::clone(&self.gateway),
                    Arc::clone(&self.metrics),
                    Arc::clone(forecast),
                    predictive.clone(),
                );
                ControlLoop::predictive(scaler, interval.value, predictive.interval)
            }
            _ => ControlLoop::reactive(reactive, interval.value),
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(control.run(shutdown_rx));
        if let Some(old) = self.registry.insert(
            function.name.clone(),
            LoopSlot {
                handle,
                shutdown_tx,
            },
        ) {
            let _ = old.shutdown_tx.send(true);
        }

        info!(
            function = %function.name,
            namespace = %function.namespace,
            interval = ?interval.value,
            default_interval = interval.defaulted(),
            "function discovered"
        );
    }

    /// Discover on every interval (first pass immediately) until `shutdown`
    /// changes, then stop every loop.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut discovery = tokio::time::interval(self.config.discovery_interval);
        info!(
            namespace = %self.config.namespace,
            interval = ?self.config.discovery_interval,
            predictive = self.forecast.is_some() && self.config.predictive.is_some(),
            "supervisor started"
        );

        loop {
            tokio::select! {
                _ = discovery.tick() => {
                    if let Err(e) = self.reconcile().await {
                        warn!(error = %e, "discovery failed, keeping current loops");
                    }
                }
                _ = shutdown.changed() => {
                    info!("supervisor shutting down");
                    break;
                }
            }
        }

        self.stop_all().await;
    }

    /// Stop all loops and wait for them to finish.
    pub async fn stop_all(&mut self) {
        for (name, slot) in self.registry.drain() {
            let _ = slot.shutdown_tx.send(true);
            if let Err(e) = slot.handle.await {
                warn!(function = %name, error = %e, "control loop ended abnormally");
            }
        }
        info!("all control loops stopped");
    }

    /// Names of functions with a registered loop, sorted.
    pub fn active_functions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.registry
            .get(name)
            .is_some_and(|slot| !slot.handle.is_finished())
    }
}
