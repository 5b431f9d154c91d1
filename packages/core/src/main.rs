mod api;
mod config;
mod dashboard;
mod error;
mod gas;
mod services;

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::Config;
use crate::dashboard::DashboardService;
use crate::gas::ProfileTable;
use crate::services::{GasPriceProvider, SyntheticGasProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Missing .env is fine; real environment variables still apply.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gas_tracker=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let profiles = Arc::new(ProfileTable::default());
    let provider: Arc<dyn GasPriceProvider> =
        Arc::new(SyntheticGasProvider::new(Arc::clone(&profiles)));

    let service = DashboardService::start(&config, Arc::clone(&profiles), provider).await?;
    let app = api::router(AppState::new(
        service.snapshots(),
        service.connections(),
        profiles,
    ));

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Gas tracker listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    service.shutdown().await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
