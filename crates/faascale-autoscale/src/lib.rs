//! faascale-autoscale — the scaling decision engine.
//!
//! A `Supervisor` discovers functions on the gateway and runs one
//! `ControlLoop` per function. Each loop owns its scaler: a
//! `ReactiveScaler` that maps in-flight load to replicas behind a
//! scale-down debounce, optionally wrapped in a `PredictiveScaler` that
//! scales ahead of forecast load and falls back to reactive decisions when
//! the forecast drifts.
//!
//! # Architecture
//!
//! ```text
//!                 ┌────────────┐ list_functions
//!                 │ Supervisor │────────────────▶ GatewayClient
//!                 └─────┬──────┘
//!                       │ spawn per function
//!                       ▼
//!                ┌─────────────┐
//!                │ ControlLoop │  select!(reactive, predict, shutdown)
//!                └──────┬──────┘
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ReactiveScaler ◀──wraps── PredictiveScaler ──▶ ForecastClient
//!     │      │
//!     │      └── Debounce (oneshot handoff, delayed re-sample)
//!     ▼
//!   compute_target ──▶ GatewayClient::set_replicas
//! ```

pub mod config;
pub mod control_loop;
pub mod debounce;
pub mod policy;
pub mod predictive;
pub mod queries;
pub mod reactive;
pub mod supervisor;
pub mod window;

#[cfg(test)]
mod testing;

pub use config::{CapacityTarget, ConfigError, PredictiveConfig, ScalerConfig};
pub use control_loop::{ControlLoop, FunctionScaler};
pub use debounce::{CancelOutcome, Debounce};
pub use policy::compute_target;
pub use predictive::PredictiveScaler;
pub use reactive::{ReactiveScaler, ScaleDecision};
pub use supervisor::{Reconciled, Supervisor};
pub use window::{BoundedWindow, mean_absolute_error};
