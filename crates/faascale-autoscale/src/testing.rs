//! In-memory collaborators for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use faascale_core::*;

/// Gateway whose replica writes are applied to its own snapshots.
#[derive(Default)]
pub struct FakeGateway {
    inner: Mutex<GatewayState>,
}

#[derive(Default)]
struct GatewayState {
    functions: Vec<FunctionDescriptor>,
    snapshots: HashMap<String, ReplicaSnapshot>,
    writes: Vec<(String, u32)>,
    fail_list: bool,
    fail_read: bool,
    fail_write: bool,
    read_delay: Option<Duration>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put_snapshot(&self, name: &str, snapshot: ReplicaSnapshot) {
        self.inner
            .lock()
            .unwrap()
            .snapshots
            .insert(name.to_string(), snapshot);
    }

    pub fn set_functions(&self, functions: Vec<FunctionDescriptor>) {
        self.inner.lock().unwrap().functions = functions;
    }

    pub fn fail_list(&self, fail: bool) {
        self.inner.lock().unwrap().fail_list = fail;
    }

    pub fn fail_read(&self, fail: bool) {
        self.inner.lock().unwrap().fail_read = fail;
    }

    pub fn fail_write(&self, fail: bool) {
        self.inner.lock().unwrap().fail_write = fail;
    }

    /// Stall the next replica read, whoever issues it.
    pub fn delay_next_read(&self, delay: Duration) {
        self.inner.lock().unwrap().read_delay = Some(delay);
    }

    pub fn writes(&self) -> Vec<(String, u32)> {
        self.inner.lock().unwrap().writes.clone()
    }

    pub fn replicas(&self, name: &str) -> Option<u32> {
        self.inner
            .lock()
            .unwrap()
            .snapshots
            .get(name)
            .map(|s| s.replicas)
    }
}

#[async_trait]
impl GatewayClient for FakeGateway {
    async fn list_functions(&self, namespace: &str) -> ScaleResult<Vec<FunctionDescriptor>> {
        let state = self.inner.lock().unwrap();
        if state.fail_list {
            return Err(ScaleError::Discovery {
                namespace: namespace.to_string(),
                reason: "gateway unavailable".into(),
            });
        }
        Ok(state
            .functions
            .iter()
            .filter(|f| f.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn get_replicas(&self, name: &str, _namespace: &str) -> ScaleResult<ReplicaSnapshot> {
        let delay = self.inner.lock().unwrap().read_delay.take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.inner.lock().unwrap();
        if state.fail_read {
            return Err(ScaleError::ReplicaRead {
                function: name.to_string(),
                reason: "gateway unavailable".into(),
            });
        }
        state
            .snapshots
            .get(name)
            .copied()
            .ok_or_else(|| ScaleError::ReplicaRead {
                function: name.to_string(),
                reason: "not found".into(),
            })
    }

    async fn set_replicas(&self, name: &str, _namespace: &str, count: u32) -> ScaleResult<()> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_write {
            return Err(ScaleError::ReplicaWrite {
                function: name.to_string(),
                count,
                reason: "gateway unavailable".into(),
            });
        }
        state.writes.push((name.to_string(), count));
        if let Some(s) = state.snapshots.get_mut(name) {
            s.replicas = count;
        }
        Ok(())
    }
}

/// Metrics backend answering from a query → value table.
#[derive(Default)]
pub struct FakeMetrics {
    inner: Mutex<MetricsState>,
}

#[derive(Default)]
struct MetricsState {
    values: HashMap<String, f64>,
    failing: HashSet<String>,
    calls: Vec<String>,
}

impl FakeMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, query: &str, value: f64) {
        self.inner
            .lock()
            .unwrap()
            .values
            .insert(query.to_string(), value);
    }

    pub fn fail(&self, query: &str, fail: bool) {
        let mut state = self.inner.lock().unwrap();
        if fail {
            state.failing.insert(query.to_string());
        } else {
            state.failing.remove(query);
        }
    }

    pub fn calls(&self, query: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|q| *q == query)
            .count()
    }
}

#[async_trait]
impl MetricsClient for FakeMetrics {
    async fn fetch(&self, query: &str) -> ScaleResult<Sample> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(query.to_string());
        if state.failing.contains(query) {
            return Err(ScaleError::MetricsQuery {
                query: query.to_string(),
                reason: "connection refused".into(),
            });
        }
        match state.values.get(query) {
            Some(&value) => Ok(Sample {
                value,
                timestamp: 0.0,
            }),
            None => Err(ScaleError::EmptyResult {
                query: query.to_string(),
            }),
        }
    }
}

/// Forecast service returning canned forecasts and losses.
#[derive(Default)]
pub struct FakeForecast {
    inner: Mutex<ForecastState>,
}

#[derive(Default)]
struct ForecastState {
    forecast: Vec<f64>,
    loss: f64,
    fail_predict: bool,
    fail_retrain: bool,
    predict_inputs: Vec<Vec<f64>>,
    retrain_inputs: Vec<Vec<f64>>,
}

impl FakeForecast {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_forecast(&self, forecast: Vec<f64>) {
        self.inner.lock().unwrap().forecast = forecast;
    }

    pub fn set_loss(&self, loss: f64) {
        self.inner.lock().unwrap().loss = loss;
    }

    pub fn fail_predict(&self, fail: bool) {
        self.inner.lock().unwrap().fail_predict = fail;
    }

    pub fn fail_retrain(&self, fail: bool) {
        self.inner.lock().unwrap().fail_retrain = fail;
    }

    pub fn predict_inputs(&self) -> Vec<Vec<f64>> {
        self.inner.lock().unwrap().predict_inputs.clone()
    }

    pub fn retrain_inputs(&self) -> Vec<Vec<f64>> {
        self.inner.lock().unwrap().retrain_inputs.clone()
    }
}

#[async_trait]
impl ForecastClient for FakeForecast {
    async fn predict(&self, window: &[f64]) -> ScaleResult<Vec<f64>> {
        let mut state = self.inner.lock().unwrap();
        state.predict_inputs.push(window.to_vec());
        if state.fail_predict {
            return Err(ScaleError::Forecast("unavailable".into()));
        }
        Ok(state.forecast.clone())
    }

    async fn update_model(&self, window: &[f64]) -> ScaleResult<f64> {
        let mut state = self.inner.lock().unwrap();
        state.retrain_inputs.push(window.to_vec());
        if state.fail_retrain {
            return Err(ScaleError::Retrain("unavailable".into()));
        }
        Ok(state.loss)
    }
}

/// Snapshot with the given replicas and bounds; available == replicas.
pub fn snapshot(replicas: u32, min: u32, max: u32, target_load: f64) -> ReplicaSnapshot {
    ReplicaSnapshot {
        replicas,
        available_replicas: replicas,
        min_replicas: min,
        max_replicas: max,
        scaling_factor: 10,
        target_load,
    }
}
