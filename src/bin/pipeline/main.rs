//! Pipeline orchestrator - runs the named stages in order

use anyhow::Result;
use std::env;
use tracing::{error, info, warn};
use user_etl::pipeline::{clean, corrupt, enrich, ingest, Config};

const DEFAULT_STAGES: [&str; 3] = ["ingest", "clean", "enrich"];

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG set there reaches the filter
    dotenvy::dotenv().ok();
    user_etl::init_tracing();

    info!("Starting ETL pipeline");

    let config = Config::from_env()?;
    info!("Configuration loaded");

    // Stages from command line args, or the default run
    let args: Vec<String> = env::args().collect();
    let stages = if args.len() > 1 {
        args[1..].to_vec()
    } else {
        DEFAULT_STAGES.iter().map(|s| s.to_string()).collect()
    };

    for stage in stages {
        info!("=== Stage: {} ===", stage);

        let result = match stage.as_str() {
            "ingest" => ingest::run(&config).await.map(|stats| stats.to_string()),
            "corrupt" => corrupt::run(&config).await.map(|stats| stats.to_string()),
            "clean" => clean::run(&config).await.map(|outcome| {
                format!(
                    "{} -> {} rows",
                    outcome.before.total_rows, outcome.after.total_rows
                )
            }),
            "enrich" => enrich::run(&config.enrich)
                .map(|counts| format!("{} rows", counts.enriched_rows)),
            _ => {
                warn!("Unknown stage: {}", stage);
                continue;
            }
        };

        match result {
            Ok(summary) => info!("✓ {} completed: {}", stage, summary),
            Err(e) => error!("✗ {} failed: {:#}", stage, e),
        }
    }

    info!("ETL pipeline complete");

    Ok(())
}
