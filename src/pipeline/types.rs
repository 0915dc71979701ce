//! Core data types for the ETL pipeline
//! Pure data structures with no behavior

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Format of `fecha_extraccion` and of report timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column order of the `usuarios` table
pub const USER_COLUMNS: [&str; 7] = [
    "id",
    "nombre",
    "apellido",
    "email",
    "genero",
    "pais",
    "fecha_extraccion",
];

/// User record extracted from the random user API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub country: String,
    pub extracted_at: String,
}

/// Database row from the usuarios table
/// Every data column is nullable, the corruption stage relies on it
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    #[sqlx(rename = "nombre")]
    pub first_name: Option<String>,
    #[sqlx(rename = "apellido")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[sqlx(rename = "genero")]
    pub gender: Option<String>,
    #[sqlx(rename = "pais")]
    pub country: Option<String>,
    #[sqlx(rename = "fecha_extraccion")]
    pub extracted_at: Option<String>,
}

impl UserRow {
    /// Cells in `USER_COLUMNS` order
    pub fn into_cells(self) -> Vec<Option<String>> {
        vec![
            Some(self.id.to_string()),
            self.first_name,
            self.last_name,
            self.email,
            self.gender,
            self.country,
            self.extracted_at,
        ]
    }
}

/// How the store treats emails that already exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestMode {
    /// UNIQUE email, insert-or-replace, one transaction per batch
    Strict,
    /// No uniqueness constraint, failed rows are logged and skipped
    #[default]
    Permissive,
}

impl std::fmt::Display for IngestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestMode::Strict => write!(f, "strict"),
            IngestMode::Permissive => write!(f, "permissive"),
        }
    }
}

impl FromStr for IngestMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(IngestMode::Strict),
            "permissive" => Ok(IngestMode::Permissive),
            other => Err(anyhow::anyhow!(
                "Unknown ingest mode '{}' (expected 'strict' or 'permissive')",
                other
            )),
        }
    }
}

/// In-memory tabular data: a header plus rows of nullable text cells
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Remove a column by name; a missing column leaves the table unchanged
    pub fn drop_column(self, name: &str) -> Table {
        let Some(idx) = self.column_index(name) else {
            return self;
        };

        let mut columns = self.columns;
        columns.remove(idx);

        let rows = self
            .rows
            .into_iter()
            .map(|mut row| {
                if idx < row.len() {
                    row.remove(idx);
                }
                row
            })
            .collect();

        Table { columns, rows }
    }
}

/// Type inferred from the non-null values of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    /// Column holds no non-null value
    Empty,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Text => write!(f, "text"),
            ColumnType::Empty => write!(f, "empty"),
        }
    }
}

/// Per-column part of a cleaning summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnProfile {
    pub name: String,
    pub null_count: usize,
    pub column_type: ColumnType,
}

/// Point-in-time snapshot of a table, before or after cleaning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleaningSummary {
    pub total_rows: usize,
    pub duplicate_rows: usize,
    pub columns: Vec<ColumnProfile>,
}

impl CleaningSummary {
    pub fn null_count(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.null_count)
    }

    pub fn total_nulls(&self) -> usize {
        self.columns.iter().map(|c| c.null_count).sum()
    }
}

impl std::fmt::Display for CleaningSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "total rows: {}", self.total_rows)?;
        writeln!(f, "duplicate rows: {}", self.duplicate_rows)?;
        writeln!(f, "null values:")?;
        for column in &self.columns {
            writeln!(f, "  {}: {}", column.name, column.null_count)?;
        }
        writeln!(f, "column types:")?;
        for column in &self.columns {
            writeln!(f, "  {}: {}", column.name, column.column_type)?;
        }
        Ok(())
    }
}

/// Summaries produced by one cleaning run
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub before: CleaningSummary,
    pub after: CleaningSummary,
}

/// Row counts produced by one enrichment run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentCounts {
    pub base_rows: usize,
    pub additional_rows: usize,
    pub enriched_rows: usize,
}

/// Write operation statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteStats {
    pub inserted: usize,
    pub replaced: usize,
    pub errors: usize,
}

impl std::fmt::Display for WriteStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "inserted: {}, replaced: {}, errors: {}",
            self.inserted, self.replaced, self.errors
        )
    }
}

/// Corruption operation statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CorruptionStats {
    pub duplicated: usize,
    pub nulled: usize,
}

impl std::fmt::Display for CorruptionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "duplicated: {}, nulled: {}", self.duplicated, self.nulled)
    }
}
