//! Collaborator traits consumed by the decision engine.
//!
//! Implementations must bound every call by a network timeout; the engine
//! never wraps them in one itself.

use async_trait::async_trait;

use crate::error::ScaleResult;
use crate::types::{FunctionDescriptor, ReplicaSnapshot, Sample};

/// The platform gateway: function inventory and replica control.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// List every function deployed in `namespace`.
    async fn list_functions(&self, namespace: &str) -> ScaleResult<Vec<FunctionDescriptor>>;

    /// Read the current replica state and scaling bounds of one function.
    async fn get_replicas(&self, name: &str, namespace: &str) -> ScaleResult<ReplicaSnapshot>;

    /// Set the desired replica count of one function.
    async fn set_replicas(&self, name: &str, namespace: &str, count: u32) -> ScaleResult<()>;
}

/// The metrics backend.
#[async_trait]
pub trait MetricsClient: Send + Sync {
    /// Execute an instant query and return its first scalar sample.
    ///
    /// An empty result set is reported as `ScaleError::EmptyResult`.
    async fn fetch(&self, query: &str) -> ScaleResult<Sample>;
}

/// The load forecast service.
#[async_trait]
pub trait ForecastClient: Send + Sync {
    /// Forecast the next steps of load given a window of recent samples.
    async fn predict(&self, window: &[f64]) -> ScaleResult<Vec<f64>>;

    /// Retrain the model on a history window and report the training loss.
    async fn update_model(&self, window: &[f64]) -> ScaleResult<f64>;
}
