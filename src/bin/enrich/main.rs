//! Enrichment entry point - merge the cleaned dataset with the additional source

use anyhow::Result;
use tracing::{error, info};
use user_etl::pipeline::{enrich, Config};

fn main() -> Result<()> {
    // Load .env first so RUST_LOG set there reaches the filter
    dotenvy::dotenv().ok();
    user_etl::init_tracing();

    let config = Config::from_env()?;
    info!("Starting enrichment of {:?}", config.enrich.cleaned_data_path);

    match enrich::run(&config.enrich) {
        Ok(counts) => info!("✓ Enrichment complete: {} rows", counts.enriched_rows),
        Err(e) => error!("✗ Enrichment failed: {:#}", e),
    }

    Ok(())
}
