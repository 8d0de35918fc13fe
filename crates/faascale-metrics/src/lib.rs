//! faascale-metrics — Prometheus metrics adapter.
//!
//! Runs instant queries through `GET /api/v1/query` and returns the first
//! sample of the result vector. The engine only issues aggregated
//! (`sum(...)`) queries, so a vector holds at most one series.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use faascale_core::{HttpClient, MetricsClient, Sample, ScaleError, ScaleResult};

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<VectorSample>,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    /// `[unix_timestamp, "value"]`
    value: (f64, String),
}

/// Instant-query client for one Prometheus server.
#[derive(Clone)]
pub struct PrometheusClient {
    base: String,
    http: HttpClient,
}

impl PrometheusClient {
    pub fn new(host: &str, port: u16, http: HttpClient) -> Self {
        Self {
            base: format!("http://{host}:{port}"),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn query_url(&self, query: &str) -> ScaleResult<String> {
        let encoded = serde_urlencoded::to_string([("query", query)]).map_err(|e| {
            ScaleError::MetricsQuery {
                query: query.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(format!("{}/api/v1/query?{encoded}", self.base))
    }
}

#[async_trait]
impl MetricsClient for PrometheusClient {
    async fn fetch(&self, query: &str) -> ScaleResult<Sample> {
        let failed = |reason: String| ScaleError::MetricsQuery {
            query: query.to_string(),
            reason,
        };

        let url = self.query_url(query)?;
        let resp: QueryResponse = self
            .http
            .get_json(&url)
            .await
            .map_err(|e| failed(e.to_string()))?;

        if resp.status != "success" {
            return Err(failed(
                resp.error
                    .unwrap_or_else(|| format!("status {}", resp.status)),
            ));
        }

        let Some(first) = resp.data.and_then(|d| d.result.into_iter().next()) else {
            return Err(ScaleError::EmptyResult {
                query: query.to_string(),
            });
        };
        let (timestamp, raw) = first.value;
        let value = raw
            .parse::<f64>()
            .map_err(|e| failed(format!("unparsable sample value {raw:?}: {e}")))?;

        debug!(%query, value, timestamp, "metrics sample");
        Ok(Sample { value, timestamp })
    }
}
