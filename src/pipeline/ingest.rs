//! Ingestion stage - fetch users and load them into a freshly recreated table

use crate::pipeline::config::{Config, FetchConfig};
use crate::pipeline::fetch;
use crate::pipeline::store;
use crate::pipeline::types::{IngestMode, WriteStats};
use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Recreate the table, fetch users and insert them
/// A failed fetch still succeeds, with nothing written
pub async fn ingest(
    db: &SqlitePool,
    fetch_config: &FetchConfig,
    mode: IngestMode,
) -> Result<WriteStats> {
    info!("Step 1/3: Recreating table...");
    store::recreate_table(db, mode).await?;

    info!("Step 2/3: Fetching users...");
    let records = fetch::fetch_users(fetch_config).await;
    if records.is_empty() {
        // Either the API failed or it returned nothing; both leave the table empty
        warn!("No users fetched, nothing to insert");
    }

    info!("Step 3/3: Writing to database...");
    store::insert_users(db, &records, mode).await
}

/// Run the ingestion stage against the configured database
pub async fn run(config: &Config) -> Result<WriteStats> {
    let db = store::connect(&config.store.database_path).await?;
    let result = ingest(&db, &config.fetch, config.store.ingest_mode).await;
    db.close().await;
    result
}
