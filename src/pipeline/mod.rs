//! ETL pipeline - fetch, store, corrupt, clean and enrich user records

pub mod clean;
pub mod config;
pub mod corrupt;
pub mod enrich;
pub mod fetch;
pub mod ingest;
pub mod parse;
pub mod store;
pub mod types;
pub mod utils;

pub use config::Config;
pub use types::*;
