//! faascale-forecast — gRPC adapter for the load forecasting service.
//!
//! The channel is created lazily: the daemon starts even when the service
//! is not up yet, and every call reconnects as needed. Each call is bounded
//! by the configured timeout.

/// Generated protobuf types and the `PredictService` client.
pub mod proto {
    tonic::include_proto!("faas_autoscaler");
}

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use faascale_core::{ForecastClient, ScaleError, ScaleResult};

use crate::proto::predict_service_client::PredictServiceClient;
use crate::proto::{PredictRequest, UpdateRequest};

/// The configured forecast address cannot be used.
#[derive(Debug, Error)]
#[error("invalid forecast address {address:?}: {reason}")]
pub struct InvalidAddress {
    pub address: String,
    pub reason: String,
}

/// Forecast collaborator backed by `PredictService`.
#[derive(Debug, Clone)]
pub struct GrpcForecast {
    client: PredictServiceClient<Channel>,
    address: String,
}

impl GrpcForecast {
    /// `address` is `host:port` or a full `http://host:port` URI.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(address: &str, timeout: Duration) -> Result<Self, InvalidAddress> {
        let uri = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        };
        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            })?
            .timeout(timeout)
            .connect_timeout(timeout);

        Ok(Self {
            client: PredictServiceClient::new(endpoint.connect_lazy()),
            address: uri,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

fn status_reason(status: &tonic::Status) -> String {
    format!("{}: {}", status.code(), status.message())
}

#[async_trait]
impl ForecastClient for GrpcForecast {
    async fn predict(&self, window: &[f64]) -> ScaleResult<Vec<f64>> {
        let request = PredictRequest {
            slide_window: window.to_vec(),
        };
        let response = self
            .client
            .clone()
            .predict(request)
            .await
            .map_err(|s| ScaleError::Forecast(status_reason(&s)))?;

        let results = response.into_inner().results;
        debug!(address = %self.address, steps = results.len(), "forecast received");
        Ok(results)
    }

    async fn update_model(&self, window: &[f64]) -> ScaleResult<f64> {
        let request = UpdateRequest {
            history_window: window.to_vec(),
        };
        let response = self
            .client
            .clone()
            .update_model(request)
            .await
            .map_err(|s| ScaleError::Retrain(status_reason(&s)))?;

        Ok(response.into_inner().loss)
    }
}
