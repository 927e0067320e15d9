//! Fixedledger API Server
//!
//! Main entry point for the depreciation and period-locking service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::StatusCode;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use fixedledger_api::{AppState, create_router};
use fixedledger_core::period::PeriodLockManager;
use fixedledger_core::posting::PostingCoordinator;
use fixedledger_db::{AssetRepository, PeriodRepository, PostingRepository, connect_with};
use fixedledger_shared::AppConfig;
use fixedledger_shared::config::LoggingConfig;

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let db = connect_with(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let locks = PeriodLockManager::new(Arc::new(PeriodRepository::new(db.clone())));
    let coordinator = PostingCoordinator::new(
        Arc::new(AssetRepository::new(db.clone())),
        Arc::new(PostingRepository::new(db)),
        locks,
    );

    let app = create_router(AppState::new(coordinator)).layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.server.request_timeout_secs),
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
