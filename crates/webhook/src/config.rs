//! Server options and their loading from the environment.
//!
//! Every field has a default, so an empty environment yields a server on port
//! 443 reading `/admission-server/tls.{crt,key}`. Variables are prefixed with
//! `ADMISSION_` (`ADMISSION_PORT`, `ADMISSION_CERT_FILE`, ...).

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable prefix for [`ServerOptions::from_env`].
pub const ENV_PREFIX: &str = "ADMISSION";

/// Options for [`crate::WebhookServer`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerOptions {
    /// Address to bind the listener to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,

    /// Port the HTTPS listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// PEM-encoded certificate chain.
    #[serde(default = "default_cert_file")]
    pub cert_file: PathBuf,

    /// PEM-encoded private key.
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,

    /// Log every decoded request and encoded response, and pretty-print
    /// response bodies.
    #[serde(default)]
    pub debug: bool,

    /// How long a signal-triggered shutdown waits for in-flight requests.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_bind_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_port() -> u16 {
    443
}
fn default_cert_file() -> PathBuf {
    "/admission-server/tls.crt".into()
}
fn default_key_file() -> PathBuf {
    "/admission-server/tls.key".into()
}
fn default_shutdown_grace_secs() -> u64 {
    30
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            cert_file: default_cert_file(),
            key_file: default_key_file(),
            debug: false,
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl ServerOptions {
    /// Load and validate options from `ADMISSION_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a value is invalid.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("failed to build webhook configuration from environment")?;
        Self::from_config(cfg)
    }

    /// Deserialize and validate options from an already-built [`config::Config`].
    pub fn from_config(cfg: config::Config) -> Result<Self> {
        let opts: ServerOptions = cfg
            .try_deserialize()
            .context("failed to deserialise webhook configuration")?;
        opts.validate()?;
        Ok(opts)
    }

    /// Socket address the listener binds to.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Grace period for signal-triggered shutdown.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    ///
    /// Port 0 is rejected here; it is still accepted when options are built in
    /// code (tests bind ephemeral ports that way).
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("{ENV_PREFIX}_PORT must be non-zero");
        }
        ensure_non_empty(&self.cert_file, "CERT_FILE")?;
        ensure_non_empty(&self.key_file, "KEY_FILE")?;
        if self.shutdown_grace_secs == 0 {
            anyhow::bail!("{ENV_PREFIX}_SHUTDOWN_GRACE_SECS must be > 0");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &std::path::Path, name: &str) -> Result<()> {
    if value.as_os_str().is_empty() {
        anyhow::bail!("{ENV_PREFIX}_{name} is required and must not be empty");
    }
    Ok(())
}
