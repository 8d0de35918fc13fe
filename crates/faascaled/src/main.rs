//! faascaled — the faascale daemon.
//!
//! Wires the collaborator adapters into the discovery supervisor:
//! - Gateway (OpenFaaS REST, optional basic auth)
//! - Metrics (Prometheus instant queries)
//! - Forecast (gRPC `PredictService`, optional; enables predictive mode)
//!
//! # Usage
//!
//! ```text
//! faas_prometheus_host=prometheus gateway_address=http://gateway:8080 faascaled
//! faascaled --prometheus-host prometheus --gateway-address http://gateway:8080 \
//!     --forecast-address predictor:50051 --log-format json
//! ```

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use faascale_autoscale::Supervisor;
use faascale_core::HttpClient;
use faascale_forecast::GrpcForecast;
use faascale_gateway::OpenFaasGateway;
use faascale_metrics::PrometheusClient;

use crate::config::{LogFormat, Settings};

const DEFAULT_LOG_FILTER: &str = "info,faascaled=debug,faascale=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    init_tracing(settings.log_format);

    let config = settings
        .scaler_config()
        .context("invalid autoscaler configuration")?;

    // ── Collaborators ──────────────────────────────────────────

    let mut gateway_http = HttpClient::new(settings.network_timeout);
    match settings.basic_auth() {
        Some((user, password)) => gateway_http = gateway_http.with_basic_auth(user, password),
        None if settings.basic_auth_user.is_some() || settings.basic_auth_password.is_some() => {
            warn!("basic auth needs both user and password, sending requests without it");
        }
        None => {}
    }
    let gateway = OpenFaasGateway::new(&settings.gateway_address, gateway_http)?;
    info!(address = %gateway.base_url(), "gateway client ready");

    let metrics = PrometheusClient::new(
        &settings.prometheus_host,
        settings.prometheus_port,
        HttpClient::new(settings.network_timeout),
    );
    info!(address = %metrics.base_url(), "prometheus client ready");

    let mut supervisor = Supervisor::new(Arc::new(gateway), Arc::new(metrics), config);
    if let Some(address) = &settings.forecast_address {
        let forecast = GrpcForecast::new(address, settings.network_timeout)?;
        info!(address = %forecast.address(), "forecast client ready, predictive scaling enabled");
        supervisor = supervisor.with_forecast(Arc::new(forecast));
    }

    // ── Run until signalled ────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let supervisor_handle = tokio::spawn(async move {
        supervisor.run(shutdown_rx).await;
    });

    shutdown_signal().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    supervisor_handle.await?;
    info!("faascaled stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("failed to install Ctrl-C handler")?,
            _ = term.recv() => {}
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("failed to install Ctrl-C handler")
    }
}
