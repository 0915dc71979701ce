//! Enrichment stage - merge the cleaned dataset with an additional source

use crate::pipeline::config::EnrichConfig;
use crate::pipeline::types::{EnrichmentCounts, Table};
use crate::pipeline::utils::{now_timestamp, read_csv, write_csv, write_report};
use anyhow::Result;
use tracing::{debug, info};

/// Row-wise concatenation of two tables
///
/// Columns are matched by header name. The result carries the union of
/// both headers in first-seen order; a cell missing from one side is null.
/// Rows are neither reordered nor deduplicated.
pub fn concat(base: &Table, additional: &Table) -> Table {
    let mut columns = base.columns.clone();
    for column in &additional.columns {
        if !columns.contains(column) {
            columns.push(column.clone());
        }
    }

    if columns.len() != base.columns.len() || columns.len() != additional.columns.len() {
        debug!(
            "Column sets differ: base {:?}, additional {:?}",
            base.columns, additional.columns
        );
    }

    let mut rows = Vec::with_capacity(base.row_count() + additional.row_count());
    rows.extend(align_rows(base, &columns));
    rows.extend(align_rows(additional, &columns));

    Table::new(columns, rows)
}

fn align_rows<'a>(
    table: &'a Table,
    columns: &'a [String],
) -> impl Iterator<Item = Vec<Option<String>>> + 'a {
    let positions: Vec<Option<usize>> = columns.iter().map(|c| table.column_index(c)).collect();

    table.rows.iter().map(move |row| {
        positions
            .iter()
            .map(|pos| pos.and_then(|idx| row.get(idx).cloned().flatten()))
            .collect()
    })
}

pub fn render_report(counts: &EnrichmentCounts, generated_at: &str) -> String {
    format!(
        "=== ENRICHMENT REPORT ===\n\
         Generated at: {}\n\
         \n\
         Base dataset rows: {}\n\
         Additional dataset rows: {}\n\
         Enriched dataset rows: {}\n",
        generated_at, counts.base_rows, counts.additional_rows, counts.enriched_rows
    )
}

/// Merge the configured input files into the enriched CSV and report
pub fn run(config: &EnrichConfig) -> Result<EnrichmentCounts> {
    info!("Loading base dataset from {:?}", config.cleaned_data_path);
    let base = read_csv(&config.cleaned_data_path)?;

    info!("Loading additional dataset from {:?}", config.additional_data_path);
    let additional = read_csv(&config.additional_data_path)?;

    let enriched = concat(&base, &additional);
    write_csv(&config.enriched_data_path, &enriched)?;

    let counts = EnrichmentCounts {
        base_rows: base.row_count(),
        additional_rows: additional.row_count(),
        enriched_rows: enriched.row_count(),
    };
    info!(
        "Enrichment complete: {} + {} = {} rows",
        counts.base_rows, counts.additional_rows, counts.enriched_rows
    );

    write_report(&config.report_path, &render_report(&counts, &now_timestamp()))?;

    Ok(counts)
}
