use anyhow::Result;
use kube::Client;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod admin;
mod admission_controller;
mod config;
mod metrics;
mod watch;

use admission_controller::AdmissionController;
use config::ControllerConfig;
use metrics::AdmissionMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting router-controller...");

    let config = ControllerConfig::from_env()?;
    info!("Configuration: {:?}", config);

    let metrics = AdmissionMetrics::new()?;

    // Serve metrics and health checks
    let admin_metrics = metrics.clone();
    let metrics_addr = config.metrics_addr;
    tokio::spawn(async move {
        if let Err(e) = admin::serve(metrics_addr, admin_metrics).await {
            error!("Admin server error: {}", e);
        }
    });

    let client = Client::try_default().await?;
    let controller = AdmissionController::new(client, config, metrics);

    // Start route admission
    tokio::spawn(async move {
        if let Err(e) = controller.run().await {
            error!("Route admission error: {}", e);
        }
    });

    // Keep the process alive
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting...");

    Ok(())
}
