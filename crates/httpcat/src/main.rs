//! `httpcat`: an admission webhook that logs every request and allows it.
//!
//! Startup sequence:
//! 1. Load and validate [`config::Config`] from `ADMISSION_*` variables.
//! 2. Initialise structured JSON logging.
//! 3. Serve until SIGINT/SIGTERM, then drain in-flight requests.

mod cat;
mod config;
mod telemetry;

use anyhow::{Context, Result};
use webhook::WebhookServer;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = config::Config::from_env().map_err(|e| {
        eprintln!("ERROR: httpcat configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;

    // -----------------------------------------------------------------------
    // 3. Serve
    // -----------------------------------------------------------------------
    let server = WebhookServer::new(cfg.server, cat::HttpCat);
    server
        .serve_gracefully()
        .await
        .context("httpcat webhook server failed")
}
