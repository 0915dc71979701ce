//! Pipeline configuration, one section per stage

use crate::pipeline::types::IngestMode;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://randomuser.me/api/";
pub const DEFAULT_RESULTS: usize = 5000;
pub const DEFAULT_NATIONALITY: &str = "us";
pub const DEFAULT_DUPLICATE_FRACTION: f64 = 0.10;
pub const DEFAULT_NULL_FRACTION: f64 = 0.05;

/// Configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub store: StoreConfig,
    pub fetch: FetchConfig,
    pub corrupt: CorruptConfig,
    pub clean: CleanConfig,
    pub enrich: EnrichConfig,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    pub ingest_mode: IngestMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: "data/db/user_data.db".into(),
            ingest_mode: IngestMode::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub api_url: String,
    pub results: usize,
    pub nationality: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            results: DEFAULT_RESULTS,
            nationality: Some(DEFAULT_NATIONALITY.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorruptConfig {
    /// None draws the seed from OS entropy
    pub seed: Option<u64>,
    pub duplicate_fraction: f64,
    pub null_fraction: f64,
}

impl Default for CorruptConfig {
    fn default() -> Self {
        Self {
            seed: None,
            duplicate_fraction: DEFAULT_DUPLICATE_FRACTION,
            null_fraction: DEFAULT_NULL_FRACTION,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CleanConfig {
    pub cleaned_data_path: PathBuf,
    pub report_path: PathBuf,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            cleaned_data_path: "data/output/cleaned_data.csv".into(),
            report_path: "data/audit/cleaning_report.txt".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub cleaned_data_path: PathBuf,
    pub additional_data_path: PathBuf,
    pub enriched_data_path: PathBuf,
    pub report_path: PathBuf,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            cleaned_data_path: CleanConfig::default().cleaned_data_path,
            additional_data_path: "data/input/dataset.csv".into(),
            enriched_data_path: "data/output/enriched_data.csv".into(),
            report_path: "data/audit/enriched_report.txt".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let path = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        let ingest_mode = match lookup("ETL_INGEST_MODE") {
            Some(mode) => mode.parse::<IngestMode>().context("ETL_INGEST_MODE is invalid")?,
            None => defaults.store.ingest_mode,
        };

        let results = match lookup("ETL_RESULTS") {
            Some(n) => n
                .trim()
                .parse::<usize>()
                .context("ETL_RESULTS must be a valid number")?,
            None => defaults.fetch.results,
        };

        // An empty value disables the nationality filter
        let nationality = match lookup("ETL_NATIONALITY") {
            Some(nat) if nat.trim().is_empty() => None,
            Some(nat) => Some(nat.trim().to_string()),
            None => defaults.fetch.nationality,
        };

        let seed = lookup("ETL_CORRUPTION_SEED")
            .map(|s| s.trim().parse::<u64>())
            .transpose()
            .context("ETL_CORRUPTION_SEED must be a valid unsigned number")?;

        let duplicate_fraction = parse_fraction(
            lookup("ETL_DUPLICATE_FRACTION"),
            "ETL_DUPLICATE_FRACTION",
            defaults.corrupt.duplicate_fraction,
        )?;
        let null_fraction = parse_fraction(
            lookup("ETL_NULL_FRACTION"),
            "ETL_NULL_FRACTION",
            defaults.corrupt.null_fraction,
        )?;

        let cleaned_data_path = path("ETL_CLEANED_DATA_PATH", defaults.clean.cleaned_data_path);

        Ok(Config {
            store: StoreConfig {
                database_path: path("ETL_DATABASE_PATH", defaults.store.database_path),
                ingest_mode,
            },
            fetch: FetchConfig {
                api_url: lookup("ETL_API_URL").unwrap_or(defaults.fetch.api_url),
                results,
                nationality,
            },
            corrupt: CorruptConfig {
                seed,
                duplicate_fraction,
                null_fraction,
            },
            clean: CleanConfig {
                cleaned_data_path: cleaned_data_path.clone(),
                report_path: path("ETL_CLEANING_REPORT_PATH", defaults.clean.report_path),
            },
            enrich: EnrichConfig {
                cleaned_data_path,
                additional_data_path: path(
                    "ETL_ADDITIONAL_DATA_PATH",
                    defaults.enrich.additional_data_path,
                ),
                enriched_data_path: path(
                    "ETL_ENRICHED_DATA_PATH",
                    defaults.enrich.enriched_data_path,
                ),
                report_path: path("ETL_ENRICHMENT_REPORT_PATH", defaults.enrich.report_path),
            },
        })
    }
}

fn parse_fraction(raw: Option<String>, key: &str, default: f64) -> Result<f64> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    let value: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{} must be a valid number", key))?;

    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow::anyhow!("{} must be between 0 and 1, got {}", key, value));
    }

    Ok(value)
}
