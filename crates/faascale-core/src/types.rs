//! Domain types shared by the engine and the collaborator adapters.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::labels::ScalingLabels;

/// A deployed function as reported by the gateway during discovery.
///
/// Immutable snapshot; re-fetched on every discovery pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDescriptor {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: HashMap::new(),
        }
    }

    /// Attach a label (builder style).
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn key(&self) -> FunctionKey {
        FunctionKey::new(&self.name, &self.namespace)
    }
}

/// Name + namespace pair identifying a function on the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionKey {
    pub name: String,
    pub namespace: String,
}

impl FunctionKey {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.namespace)
    }
}

/// Replica state of one function, read fresh from the gateway on every
/// decision. Never cached across ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicaSnapshot {
    /// Desired replica count currently set on the gateway.
    pub replicas: u32,
    /// Replicas that are ready to serve.
    pub available_replicas: u32,
    pub min_replicas: u32,
    pub max_replicas: u32,
    /// Percentage step (0-100) advertised by the function's labels.
    pub scaling_factor: u32,
    /// Per-replica load the reactive policy aims for. Always > 0.
    pub target_load: f64,
}

impl ReplicaSnapshot {
    /// Combine the gateway's replica counts with the function's scaling labels.
    pub fn from_labels(replicas: u32, available_replicas: u32, labels: &ScalingLabels) -> Self {
        Self {
            replicas,
            available_replicas,
            min_replicas: labels.min_replicas,
            max_replicas: labels.max_replicas,
            scaling_factor: labels.scaling_factor,
            target_load: labels.target_load,
        }
    }
}

/// A single scalar point returned by a metrics query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    /// Unix timestamp (seconds, fractional) of the evaluation.
    pub timestamp: f64,
}

/// Scaling mode of one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalingMode {
    /// Threshold-based scaling on in-flight load.
    #[default]
    Reactive,
    /// Forecast-driven scaling.
    Predictive,
}

impl fmt::Display for ScalingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingMode::Reactive => f.write_str("reactive"),
            ScalingMode::Predictive => f.write_str("predictive"),
        }
    }
}
