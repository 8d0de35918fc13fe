//! faascale-gateway — OpenFaaS gateway adapter.
//!
//! Implements [`GatewayClient`] against the gateway's REST API:
//!
//! ```text
//! GET  /system/functions?namespace=<ns>              → [FunctionStatus]
//! GET  /system/function/<name>?namespace=<ns>        → FunctionStatus
//! POST /system/scale-function/<name>?namespace=<ns>  ← ScaleRequest
//! ```
//!
//! Scaling bounds are not part of the gateway's replica answer; they are
//! resolved from the function's labels on every read.

use std::collections::HashMap;

use async_trait::async_trait;
use http::Uri;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use faascale_core::{
    FunctionDescriptor, GatewayClient, HttpClient, HttpError, ReplicaSnapshot, ScaleError,
    ScaleResult, ScalingLabels,
};

/// The configured gateway address cannot be used.
#[derive(Debug, Error)]
#[error("invalid gateway address {address:?}: {reason}")]
pub struct InvalidAddress {
    pub address: String,
    pub reason: String,
}

/// Function status as reported by the gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionStatus {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    labels: Option<HashMap<String, String>>,
    #[serde(default)]
    replicas: u64,
    #[serde(default)]
    available_replicas: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScaleRequest<'a> {
    service_name: &'a str,
    namespace: &'a str,
    replicas: u32,
}

/// REST client for one OpenFaaS gateway.
#[derive(Clone)]
pub struct OpenFaasGateway {
    base: String,
    http: HttpClient,
}

impl OpenFaasGateway {
    /// `address` is the gateway's base URL, e.g. `http://gateway:8080`.
    pub fn new(address: &str, http: HttpClient) -> Result<Self, InvalidAddress> {
        let invalid = |reason: &str| InvalidAddress {
            address: address.to_string(),
            reason: reason.to_string(),
        };
        let uri: Uri = address
            .parse()
            .map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
        if uri.scheme_str() != Some("http") {
            return Err(invalid("only http:// addresses are supported"));
        }
        if uri.host().is_none() {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            base: address.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str, namespace: &str) -> String {
        // Encoding a single string pair cannot fail.
        let query = serde_urlencoded::to_string([("namespace", namespace)]).unwrap_or_default();
        format!("{}{path}?{query}", self.base)
    }
}

fn saturating_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn describe(e: HttpError) -> String {
    match e {
        HttpError::Status { status, .. } if status == http::StatusCode::NOT_FOUND => {
            "function not found".to_string()
        }
        other => other.to_string(),
    }
}

#[async_trait]
impl GatewayClient for OpenFaasGateway {
    async fn list_functions(&self, namespace: &str) -> ScaleResult<Vec<FunctionDescriptor>> {
        let url = self.url("/system/functions", namespace);
        let statuses: Vec<FunctionStatus> =
            self.http
                .get_json(&url)
                .await
                .map_err(|e| ScaleError::Discovery {
                    namespace: namespace.to_string(),
                    reason: e.to_string(),
                })?;

        debug!(%namespace, count = statuses.len(), "functions listed");
        Ok(statuses
            .into_iter()
            .map(|s| FunctionDescriptor {
                name: s.name,
                namespace: s.namespace.unwrap_or_else(|| namespace.to_string()),
                labels: s.labels.unwrap_or_default(),
            })
            .collect())
    }

    async fn get_replicas(&self, name: &str, namespace: &str) -> ScaleResult<ReplicaSnapshot> {
        let url = self.url(&format!("/system/function/{name}"), namespace);
        let status: FunctionStatus =
            self.http
                .get_json(&url)
                .await
                .map_err(|e| ScaleError::ReplicaRead {
                    function: name.to_string(),
                    reason: describe(e),
                })?;

        let labels = ScalingLabels::from_labels(&status.labels.unwrap_or_default());
        Ok(ReplicaSnapshot::from_labels(
            saturating_u32(status.replicas),
            saturating_u32(status.available_replicas),
            &labels,
        ))
    }

    async fn set_replicas(&self, name: &str, namespace: &str, count: u32) -> ScaleResult<()> {
        let url = self.url(&format!("/system/scale-function/{name}"), namespace);
        let body = ScaleRequest {
            service_name: name,
            namespace,
            replicas: count,
        };
        self.http
            .post_json(&url, &body)
            .await
            .map_err(|e| ScaleError::ReplicaWrite {
                function: name.to_string(),
                count,
                reason: describe(e),
            })
    }
}
