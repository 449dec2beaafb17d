//! Cropix API server
//!
//! Loads every trained model at startup and serves the prediction endpoints
//! over HTTP. A missing or corrupt artifact aborts startup.

use anyhow::{Context, Result};
use cropix_lib::{HealthRegistry, ServiceContext};
use cropix_server::{create_router, serve, AppState, ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting cropix-server");

    let config = ServerConfig::load()?;
    info!(
        port = config.port,
        model_dir = %config.service.model_dir.display(),
        price_data = %config.service.price_data_path.display(),
        "Server configured"
    );

    let health_registry = HealthRegistry::new();

    let context = ServiceContext::load(config.service.clone(), &config.weather)
        .context("Failed to load model artifacts")?;
    health_registry
        .record_startup(&config.service.price_data_path, context.weather().is_configured())
        .await;

    let logger = context.logger().clone();
    logger.log_startup(
        SERVER_VERSION,
        context.artifacts().loaded().len(),
        context.weather().provider_name(),
    );

    let state = Arc::new(AppState::new(context, health_registry.clone()));
    let app = create_router(state, &config.cors_origins)?;

    health_registry.set_ready(true).await;

    serve(config.port, app, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
    })
    .await?;

    logger.log_shutdown("SIGINT received");
    Ok(())
}
