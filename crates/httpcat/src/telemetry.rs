//! Structured JSON logging for httpcat.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber: JSON lines on stdout, filtered by
/// `RUST_LOG` or else `log_level`.
///
/// # Errors
///
/// Returns an error if a subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise httpcat tracing subscriber: {e}"))
}
