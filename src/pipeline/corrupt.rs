//! Corruption stage - inject duplicate rows and null names into the store

use crate::pipeline::config::{Config, CorruptConfig};
use crate::pipeline::store;
use crate::pipeline::types::{CorruptionStats, UserRow};
use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

/// Number of rows a fraction of `len` selects, rounded to nearest
fn sample_size(len: usize, fraction: f64) -> usize {
    (len as f64 * fraction).round() as usize
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Pick `count` rows uniformly, the same row may come up more than once
fn sample_with_replacement<'a, R: Rng>(
    rows: &'a [UserRow],
    count: usize,
    rng: &mut R,
) -> Vec<&'a UserRow> {
    (0..count)
        .map(|_| &rows[rng.gen_range(0..rows.len())])
        .collect()
}

/// Duplicate and null sampled rows of the `usuarios` table
///
/// Both samples are drawn from the rows present before corruption:
/// duplicates are re-inserted verbatim under new ids, then the first
/// name of each row in the null sample is cleared.
pub async fn corrupt(db: &SqlitePool, config: &CorruptConfig) -> Result<CorruptionStats> {
    let rows = store::read_users(db).await?;

    if rows.is_empty() {
        warn!("No rows to corrupt");
        return Ok(CorruptionStats::default());
    }

    let mut rng = rng_for(config.seed);

    let duplicates = sample_with_replacement(
        &rows,
        sample_size(rows.len(), config.duplicate_fraction),
        &mut rng,
    );

    let null_count = sample_size(rows.len(), config.null_fraction).min(rows.len());
    let nulled: Vec<&UserRow> = rows.choose_multiple(&mut rng, null_count).collect();

    info!(
        "Corrupting {} rows: {} duplicates, {} null names (seed: {:?})",
        rows.len(),
        duplicates.len(),
        nulled.len(),
        config.seed
    );

    if !duplicates.is_empty() && store::has_unique_email(db).await? {
        warn!(
            "usuarios enforces unique emails (strict mode); duplicate rows will be \
             rejected and the corruption rolled back"
        );
    }

    let mut tx = db.begin().await?;

    for row in &duplicates {
        store::insert_row(&mut tx, row).await?;
        debug!("Duplicated row {}", row.id);
    }

    for row in &nulled {
        store::null_first_name(&mut tx, row.id).await?;
        debug!("Nulled name of row {}", row.id);
    }

    tx.commit().await?;

    let stats = CorruptionStats {
        duplicated: duplicates.len(),
        nulled: nulled.len(),
    };
    info!("Corruption complete: {}", stats);

    Ok(stats)
}

/// Run the corruption stage against the configured database
pub async fn run(config: &Config) -> Result<CorruptionStats> {
    let db = store::connect(&config.store.database_path).await?;
    let result = corrupt(&db, &config.corrupt).await;
    db.close().await;
    result
}
