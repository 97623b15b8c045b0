//! Flowvault schema migrator.

#![forbid(unsafe_code)]

use flowvault_core::AppError;
use flowvault_infrastructure::{DatabaseConfig, connect_and_migrate};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = DatabaseConfig::from_env()?;
    info!(
        max_connections = config.max_connections,
        acquire_timeout_seconds = config.acquire_timeout.as_secs(),
        "starting flowvault migrator"
    );

    let pool = connect_and_migrate(&config).await?;
    pool.close().await;

    info!("flowvault schema is up to date");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flowvault=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
