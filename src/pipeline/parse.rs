//! Parse functions - transform random user API JSON into UserRecord structs

use crate::pipeline::types::UserRecord;
use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

/// One entry of the API `results` array; unused fields are ignored
#[derive(Debug, Deserialize)]
struct ApiUser {
    name: ApiName,
    email: String,
    gender: String,
    location: ApiLocation,
}

#[derive(Debug, Deserialize)]
struct ApiName {
    first: String,
    last: String,
}

#[derive(Debug, Deserialize)]
struct ApiLocation {
    country: String,
}

/// Parse an API response body into UserRecord structs
/// Entries missing a required field are skipped and logged
pub fn parse_users(body: &Value, extracted_at: &str) -> Result<Vec<UserRecord>> {
    let results = body
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("Response has no 'results' array"))?;

    let mut records = Vec::with_capacity(results.len());
    let mut parse_errors = 0;

    for (idx, entry) in results.iter().enumerate() {
        match ApiUser::deserialize(entry) {
            Ok(user) => records.push(to_record(user, extracted_at)),
            Err(e) => {
                parse_errors += 1;
                if parse_errors <= 10 {
                    // Only log first 10 errors
                    warn!("Failed to parse user {}: {}", idx, e);
                }
            }
        }
    }

    info!(
        "Parsed {} user records ({} errors)",
        records.len(),
        parse_errors
    );

    Ok(records)
}

fn to_record(user: ApiUser, extracted_at: &str) -> UserRecord {
    UserRecord {
        first_name: user.name.first,
        last_name: user.name.last,
        email: user.email,
        gender: user.gender,
        country: user.location.country,
        extracted_at: extracted_at.to_string(),
    }
}
