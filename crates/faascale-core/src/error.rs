//! Error taxonomy for scaling decisions.
//!
//! Every variant is recoverable from the engine's point of view: the tick
//! that produced it is aborted and logged, and the next tick starts over.

use thiserror::Error;

/// Result type alias for collaborator calls and scaling ticks.
pub type ScaleResult<T> = Result<T, ScaleError>;

/// Errors surfaced by collaborators and scaling ticks.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("failed to list functions in namespace {namespace}: {reason}")]
    Discovery { namespace: String, reason: String },

    #[error("metrics query failed: {reason} (query: {query})")]
    MetricsQuery { query: String, reason: String },

    #[error("metrics query returned no samples, target may be down (query: {query})")]
    EmptyResult { query: String },

    #[error("failed to read replicas of {function}: {reason}")]
    ReplicaRead { function: String, reason: String },

    #[error("failed to set replicas of {function} to {count}: {reason}")]
    ReplicaWrite {
        function: String,
        count: u32,
        reason: String,
    },

    #[error("forecast failed: {0}")]
    Forecast(String),

    #[error("model retrain failed: {0}")]
    Retrain(String),
}

impl ScaleError {
    /// Whether the error means the metrics backend had no data for the query.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, ScaleError::EmptyResult { .. })
    }
}
