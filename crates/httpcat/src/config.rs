//! Configuration loading for httpcat.
//!
//! Server settings come from the shared `ADMISSION_*` variables; httpcat only
//! adds `ADMISSION_LOG_LEVEL`.

use anyhow::{Context, Result};
use serde::Deserialize;
use webhook::{config::ENV_PREFIX, ServerOptions};

/// Validated httpcat configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerOptions,
    /// Default tracing filter, used when `RUST_LOG` is unset.
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
struct Logging {
    #[serde(default = "default_log_level")]
    log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("failed to build httpcat configuration")?;
        Self::from_config(cfg)
    }

    fn from_config(cfg: config::Config) -> Result<Self> {
        let logging: Logging = cfg
            .clone()
            .try_deserialize()
            .context("failed to deserialise httpcat logging configuration")?;
        if logging.log_level.trim().is_empty() {
            anyhow::bail!("{ENV_PREFIX}_LOG_LEVEL must not be empty");
        }
        let server = ServerOptions::from_config(cfg)?;
        Ok(Self {
            server,
            log_level: logging.log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::from_config(config::Config::builder().build().unwrap()).unwrap();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.server, ServerOptions::default());
    }

    #[test]
    fn log_level_and_server_options_share_a_source() {
        let src = config::Config::builder()
            .set_override("log_level", "debug")
            .unwrap()
            .set_override("port", 8443)
            .unwrap()
            .build()
            .unwrap();
        let cfg = Config::from_config(src).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.server.port, 8443);
    }

    #[test]
    fn rejects_blank_log_level() {
        let src = config::Config::builder()
            .set_override("log_level", " ")
            .unwrap()
            .build()
            .unwrap();
        assert!(Config::from_config(src).is_err());
    }
}
