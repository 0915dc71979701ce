//! Fetch functions - retrieve users from the random user API

use crate::pipeline::config::FetchConfig;
use crate::pipeline::parse::parse_users;
use crate::pipeline::types::UserRecord;
use crate::pipeline::utils::{http_get, now_timestamp, FetchError};
use serde_json::Value;
use tracing::{error, info, warn};

/// Fetch the raw API response body as JSON
pub async fn fetch_raw_users(config: &FetchConfig) -> Result<Value, FetchError> {
    let mut query = vec![("results", config.results.to_string())];
    if let Some(ref nat) = config.nationality {
        query.push(("nat", nat.clone()));
    }

    let bytes = http_get(&config.api_url, &query).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Fetch users and parse them into records
/// Any failure is logged and yields an empty sequence
pub async fn fetch_users(config: &FetchConfig) -> Vec<UserRecord> {
    info!(
        "Fetching {} users from {} (nationality: {})",
        config.results,
        config.api_url,
        config.nationality.as_deref().unwrap_or("any")
    );

    let body = match fetch_raw_users(config).await {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to fetch users from the API: {}", e);
            return Vec::new();
        }
    };

    // One extraction timestamp for the whole batch
    let extracted_at = now_timestamp();

    match parse_users(&body, &extracted_at) {
        Ok(records) => records,
        Err(e) => {
            warn!("Failed to parse API response: {}", e);
            Vec::new()
        }
    }
}
