//! Minimal JSON-over-HTTP client shared by the gateway and metrics adapters.
//!
//! Every request is bounded by the client's timeout.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = "faascale/0.1";

/// Errors from a single HTTP exchange.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode response body: {0}")]
    Decode(String),
}

/// Pooled HTTP/1 client with an optional basic-auth header.
#[derive(Clone)]
pub struct HttpClient {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
    authorization: Option<HeaderValue>,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            client,
            timeout,
            authorization: None,
        }
    }

    /// Send `Authorization: Basic ...` on every request.
    pub fn with_basic_auth(mut self, user: &str, password: &str) -> Self {
        let token = STANDARD.encode(format!("{user}:{password}"));
        self.authorization = HeaderValue::from_str(&format!("Basic {token}")).ok();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `uri` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, uri: &str) -> Result<T, HttpError> {
        let body = self.send(Method::GET, uri, Bytes::new()).await?;
        serde_json::from_slice(&body).map_err(|e| HttpError::Decode(e.to_string()))
    }

    /// POST a JSON body to `uri`, ignoring the response body.
    pub async fn post_json<B: Serialize>(&self, uri: &str, body: &B) -> Result<(), HttpError> {
        let payload =
            serde_json::to_vec(body).map_err(|e| HttpError::InvalidRequest(e.to_string()))?;
        self.send(Method::POST, uri, Bytes::from(payload)).await?;
        Ok(())
    }

    async fn send(&self, method: Method, uri: &str, body: Bytes) -> Result<Bytes, HttpError> {
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(ACCEPT, "application/json")
            .header("user-agent", USER_AGENT);
        if !body.is_empty() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        if let Some(auth) = &self.authorization {
            builder = builder.header(AUTHORIZATION, auth.clone());
        }
        let req = builder
            .body(Full::new(body))
            .map_err(|e| HttpError::InvalidRequest(e.to_string()))?;

        let exchange = async {
            let resp = self
                .client
                .request(req)
                .await
                .map_err(|e| HttpError::Transport(e.to_string()))?;
            let status = resp.status();
            let bytes = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| HttpError::Transport(e.to_string()))?
                .to_bytes();
            Ok::<_, HttpError>((status, bytes))
        };

        let (status, bytes) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| HttpError::Timeout(self.timeout))??;

        debug!(%method, %uri, %status, "http exchange");

        if !status.is_success() {
            return Err(HttpError::Status {
                status,
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }
        Ok(bytes)
    }
}
