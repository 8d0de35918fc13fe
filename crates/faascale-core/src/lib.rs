//! faascale-core — shared model for the faascale autoscaler.
//!
//! Holds the types every other crate speaks in: function descriptors,
//! replica snapshots, metric samples, the scaling labels recognised on a
//! function, and the error taxonomy. The three collaborator traits
//! (`GatewayClient`, `MetricsClient`, `ForecastClient`) are the only seam
//! between the decision engine and the outside world.
//!
//! # Architecture
//!
//! ```text
//! faascale-autoscale ──uses──▶ GatewayClient  ◀──impl── faascale-gateway
//!                    ──uses──▶ MetricsClient  ◀──impl── faascale-metrics
//!                    ──uses──▶ ForecastClient ◀──impl── faascale-forecast
//! ```
//!
//! `HttpClient` is the small JSON-over-HTTP helper shared by the gateway and
//! metrics adapters.

pub mod client;
pub mod duration;
pub mod error;
pub mod http;
pub mod labels;
pub mod types;

pub use client::{ForecastClient, GatewayClient, MetricsClient};
pub use duration::parse_duration;
pub use error::{ScaleError, ScaleResult};
pub use http::{HttpClient, HttpError};
pub use labels::{LabelSource, LabelValue, ScalingLabels};
pub use types::*;
