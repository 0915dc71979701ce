//! Cleaning entry point - deduplicate and drop incomplete rows into a CSV

use anyhow::Result;
use tracing::{error, info};
use user_etl::pipeline::{clean, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG set there reaches the filter
    dotenvy::dotenv().ok();
    user_etl::init_tracing();

    let config = Config::from_env()?;
    info!("Starting cleaning of {:?}", config.store.database_path);

    match clean::run(&config).await {
        Ok(outcome) => info!(
            "✓ Cleaning complete: {} -> {} rows, report at {:?}",
            outcome.before.total_rows, outcome.after.total_rows, config.clean.report_path
        ),
        Err(e) => error!("✗ Cleaning failed: {:#}", e),
    }

    Ok(())
}
