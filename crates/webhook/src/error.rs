//! Process-level errors from the webhook server lifecycle.

use std::{io, net::SocketAddr, time::Duration};

use thiserror::Error;

use crate::server::tls::TlsError;

/// Errors that end [`crate::WebhookServer::serve`] or its shutdown.
///
/// Request-level failures never surface here; they are answered with HTTP 500
/// and logged.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The certificate or key could not be loaded.
    #[error("TLS configuration error: {0}")]
    Tls(#[from] TlsError),

    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// SIGINT / SIGTERM handlers could not be installed.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] io::Error),

    /// In-flight requests were still running when the grace period ended.
    #[error("graceful shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),

    /// `serve` was called while another `serve` call is running.
    #[error("webhook server is already serving")]
    AlreadyServing,

    /// `serve` was called after shutdown began.
    #[error("webhook server closed")]
    Closed,
}
