//! Ingestion entry point - fetch users from the API into a fresh table

use anyhow::Result;
use tracing::{error, info};
use user_etl::pipeline::{ingest, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG set there reaches the filter
    dotenvy::dotenv().ok();
    user_etl::init_tracing();

    let config = Config::from_env()?;
    info!("Starting ingestion into {:?}", config.store.database_path);

    match ingest::run(&config).await {
        Ok(stats) => info!("✓ Ingestion complete: {}", stats),
        Err(e) => error!("✗ Ingestion failed: {:#}", e),
    }

    Ok(())
}
