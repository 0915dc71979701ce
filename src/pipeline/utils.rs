//! Utility functions for common operations

use crate::pipeline::types::{Table, TIMESTAMP_FORMAT};
use anyhow::{Context, Result};
use chrono::Local;
use reqwest::{Client, StatusCode};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Why a fetch produced no data
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Status(StatusCode),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// GET a URL with query parameters, failing on any non-success status
pub async fn http_get(url: &str, query: &[(&str, String)]) -> Result<Vec<u8>, FetchError> {
    info!("Downloading from {}", url);
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(300)) // 5 min timeout
        .build()?;

    let response = client.get(url).query(query).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    let bytes = response.bytes().await?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

/// Local wall-clock time in `TIMESTAMP_FORMAT`
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Create the parent directory of an output file if needed
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }
    Ok(())
}

/// Read a headed CSV file; empty cells become nulls
pub fn read_csv(path: &Path) -> Result<Table> {
    let file = fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    read_csv_from_reader(file).with_context(|| format!("Failed to read CSV {:?}", path))
}

pub fn read_csv_from_reader<R: Read>(reader: R) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for (row_idx0, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() > columns.len() {
            // 1-based, header is row 1
            anyhow::bail!(
                "row {} has {} fields, header has {}",
                row_idx0 + 2,
                record.len(),
                columns.len()
            );
        }

        let mut row: Vec<Option<String>> = record.iter().map(to_cell).collect();
        // Short rows are padded with nulls
        row.resize(columns.len(), None);
        rows.push(row);
    }

    Ok(Table::new(columns, rows))
}

/// Blank text is treated as null everywhere a cell is read
pub fn to_cell(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Write a table as CSV with a header row, overwriting the file; nulls become empty cells
pub fn write_csv(path: &Path, table: &Table) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = fs::File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_csv_to_writer(file, table).with_context(|| format!("Failed to write CSV {:?}", path))?;
    info!("Wrote {} rows to {:?}", table.row_count(), path);
    Ok(())
}

pub fn write_csv_to_writer<W: Write>(writer: W, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a plain-text audit report, overwriting any previous one
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, contents).with_context(|| format!("Failed to write report {:?}", path))?;
    info!("Wrote audit report to {:?}", path);
    Ok(())
}
