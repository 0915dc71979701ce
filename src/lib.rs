// Library module for testable functions

pub mod pipeline;

use tracing_subscriber::EnvFilter;

/// Filter built from `directives`, or INFO when unset or unparsable
fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Install the fmt subscriber used by every entry point.
/// `RUST_LOG` replaces the default INFO filter entirely, so load `.env`
/// before calling this.
pub fn init_tracing() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(directives.as_deref()))
        .with_target(false)
        .init();
}
