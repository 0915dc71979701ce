//! Preview entry point - print a small raw API response

use anyhow::Result;
use tracing::error;
use user_etl::pipeline::config::FetchConfig;
use user_etl::pipeline::{fetch, Config};

const PREVIEW_RESULTS: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG set there reaches the filter
    dotenvy::dotenv().ok();
    user_etl::init_tracing();

    let config = Config::from_env()?;
    let preview = FetchConfig {
        results: PREVIEW_RESULTS,
        nationality: None,
        ..config.fetch
    };

    match fetch::fetch_raw_users(&preview).await {
        Ok(body) if body.get("results").is_some() => {
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Ok(_) => error!("Response carried no user results"),
        Err(e) => error!("Could not fetch user data: {}", e),
    }

    Ok(())
}
