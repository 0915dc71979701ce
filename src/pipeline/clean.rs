//! Cleaning stage - profile, deduplicate and drop incomplete rows

use crate::pipeline::config::{CleanConfig, Config};
use crate::pipeline::store;
use crate::pipeline::types::{CleaningOutcome, CleaningSummary, ColumnProfile, ColumnType, Table};
use crate::pipeline::utils::{now_timestamp, to_cell, write_csv, write_report};
use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::info;

/// Infer a column type from its non-null values
pub fn infer_column_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut inferred = ColumnType::Empty;

    for value in values {
        let value = value.trim();
        let current = if value.parse::<i64>().is_ok() {
            ColumnType::Integer
        } else if value.parse::<f64>().is_ok() {
            ColumnType::Float
        } else {
            return ColumnType::Text;
        };

        inferred = match (inferred, current) {
            (ColumnType::Empty, t) => t,
            (ColumnType::Integer, ColumnType::Integer) => ColumnType::Integer,
            _ => ColumnType::Float,
        };
    }

    inferred
}

/// Blank text counts as null: it is written to CSV as an empty cell
fn is_null(cell: &Option<String>) -> bool {
    cell.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Replace blank cells with nulls
pub fn normalize_blanks(table: Table) -> Table {
    let rows = table
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| cell.as_deref().and_then(to_cell))
                .collect()
        })
        .collect();

    Table::new(table.columns, rows)
}

/// Rows minus distinct rows, under full-row equality
pub fn count_duplicates(table: &Table) -> usize {
    let distinct: HashSet<&Vec<Option<String>>> = table.rows.iter().collect();
    table.row_count() - distinct.len()
}

pub fn summarize(table: &Table) -> CleaningSummary {
    let columns = table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells = table
                .rows
                .iter()
                .map(|row| row.get(idx).and_then(Option::as_deref))
                .filter(|cell| !cell.map_or(true, |v| v.trim().is_empty()));
            ColumnProfile {
                name: name.clone(),
                null_count: table.row_count() - cells.clone().count(),
                column_type: infer_column_type(cells.flatten()),
            }
        })
        .collect();

    CleaningSummary {
        total_rows: table.row_count(),
        duplicate_rows: count_duplicates(table),
        columns,
    }
}

/// Keep the first occurrence of every distinct row
pub fn drop_duplicates(table: Table) -> Table {
    let mut seen = HashSet::new();
    let rows = table
        .rows
        .into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect();

    Table::new(table.columns, rows)
}

/// Drop every row holding a null in any column
pub fn drop_nulls(table: Table) -> Table {
    let width = table.columns.len();
    let rows = table
        .rows
        .into_iter()
        .filter(|row| row.len() == width && !row.iter().any(is_null))
        .collect();

    Table::new(table.columns, rows)
}

/// Deduplicate, then drop incomplete rows; blank cells count as null
pub fn clean(table: Table) -> Table {
    drop_nulls(drop_duplicates(normalize_blanks(table)))
}

pub fn render_report(
    before: &CleaningSummary,
    after: &CleaningSummary,
    generated_at: &str,
) -> String {
    format!(
        "=== CLEANING REPORT ===\n\
         Generated at: {}\n\
         \n\
         Before cleaning:\n\
         {}\n\
         After cleaning:\n\
         {}",
        generated_at, before, after
    )
}

/// Clean the `usuarios` table into the configured CSV and report
///
/// The surrogate `id` column is dropped first, so rows re-inserted
/// verbatim under a new id count as duplicates. Blank text is read as
/// null, matching how the cleaned CSV is read back downstream.
pub async fn clean_store(db: &SqlitePool, config: &CleanConfig) -> Result<CleaningOutcome> {
    let table = normalize_blanks(store::read_all(db).await?.drop_column("id"));

    let before = summarize(&table);
    info!(
        "Before cleaning: {} rows, {} duplicates, {} nulls",
        before.total_rows,
        before.duplicate_rows,
        before.total_nulls()
    );

    let cleaned = clean(table);
    write_csv(&config.cleaned_data_path, &cleaned)?;

    let after = summarize(&cleaned);
    info!(
        "After cleaning: {} rows ({} removed)",
        after.total_rows,
        before.total_rows - after.total_rows
    );

    write_report(
        &config.report_path,
        &render_report(&before, &after, &now_timestamp()),
    )?;

    Ok(CleaningOutcome { before, after })
}

/// Run the cleaning stage against the configured database
pub async fn run(config: &Config) -> Result<CleaningOutcome> {
    let db = store::connect(&config.store.database_path).await?;
    let result = clean_store(&db, &config.clean).await;
    db.close().await;
    result
}
