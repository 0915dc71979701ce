//! Corruption entry point - inject duplicates and null names into the store

use anyhow::Result;
use tracing::{error, info};
use user_etl::pipeline::{corrupt, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG set there reaches the filter
    dotenvy::dotenv().ok();
    user_etl::init_tracing();

    let config = Config::from_env()?;
    info!("Starting corruption of {:?}", config.store.database_path);

    match corrupt::run(&config).await {
        Ok(stats) => info!("✓ Corruption complete: {}", stats),
        Err(e) => error!("✗ Corruption failed: {:#}", e),
    }

    Ok(())
}
