mod config;
mod s3_uploader;
mod scanner;
mod scheduler;
mod service;
mod upload_cycle;
mod video_store;

use anyhow::{Context, Result};
use config::Config;
use service::UploaderService;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use video_store::{HttpVideoStore, VideoStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level, &config.service.log_format);

    info!(
        service = %config.service.name,
        "Starting Nier Uploader Service"
    );

    // Initialize metrics
    if config.service.enable_metrics {
        init_metrics(config.service.metrics_port)?;
    }

    // Validate before constructing anything; the returned names are the
    // components this service expects the deployment to provide.
    let dependencies = config.validate().context("Invalid configuration")?;
    info!(dependencies = ?dependencies, "Configuration validated");

    // Resolve the capture component. Without an endpoint the service skips
    // the save trigger and only sweeps files already on disk.
    let video_store: Option<Arc<dyn VideoStore>> = match &config.video_store.endpoint {
        Some(endpoint) => {
            let store = HttpVideoStore::new(
                endpoint,
                &config.video_store.name,
                config.video_store.request_timeout(),
            )
            .context("Failed to create capture component client")?;
            info!(
                store = %config.video_store.name,
                endpoint = %endpoint,
                "Save trigger enabled"
            );
            Some(Arc::new(store))
        }
        None => {
            warn!(
                store = %config.video_store.name,
                "No capture endpoint configured, sweeping existing files only"
            );
            None
        }
    };

    // Start the upload job
    let mut service = UploaderService::new();
    service
        .reconfigure(&config, video_store)
        .await
        .context("Failed to start uploader job")?;

    info!("Uploader service started successfully");

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down uploader service");

    service.close().await.context("Failed to stop uploader job")?;

    info!("Uploader service stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str, log_format: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
