//! [`WebhookServer`]: the TLS listener and its start/stop lifecycle.
//!
//! Each accepted connection runs on its own Tokio task, tracked by a
//! [`TaskTracker`]. Shutdown stops the accept loop, asks every connection to
//! finish the requests it is serving, and waits for the tracker to drain.
//! Nothing is ever aborted.

use std::{
    future::Future,
    net::SocketAddr,
    sync::{Arc, OnceLock},
    time::Duration,
};

use axum::{http::Request, Router};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::watch,
};
use tokio_rustls::TlsAcceptor;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tower::Service;
use tracing::{debug, error, info, warn};

use super::{router, signal::TerminationSignals, state::AdapterState, tls};
use crate::{config::ServerOptions, error::ServerError, handler::WebhookHandler};

/// Pause after a failed `accept` (e.g. EMFILE) before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Lifecycle phase of a [`WebhookServer`].
///
/// Moves forward only: `NotStarted → Running → ShuttingDown → Stopped`.
/// `ShuttingDown` may also be entered straight from `NotStarted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Running,
    ShuttingDown,
    Stopped,
}

/// HTTPS admission webhook server.
#[derive(Debug)]
pub struct WebhookServer {
    opts: ServerOptions,
    router: Router,
    phase: watch::Sender<Phase>,
    local_addr: OnceLock<SocketAddr>,
    shutdown: CancellationToken,
    connections: TaskTracker,
}

impl WebhookServer {
    /// Create a server that answers admission requests with `handler`.
    ///
    /// Pass [`crate::AllowAll`] for a server that allows everything unchanged.
    pub fn new(opts: ServerOptions, handler: impl WebhookHandler) -> Self {
        let state = AdapterState::new(Arc::new(handler), opts.debug);
        let (phase, _) = watch::channel(Phase::NotStarted);
        Self {
            router: router::build(state),
            opts,
            phase,
            local_addr: OnceLock::new(),
            shutdown: CancellationToken::new(),
            connections: TaskTracker::new(),
        }
    }

    /// Options this server was built with.
    pub fn options(&self) -> &ServerOptions {
        &self.opts
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Watch lifecycle phase changes.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Address the listener is bound to, once [`Phase::Running`] was reached.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Load TLS material, bind, and serve until [`WebhookServer::shutdown`].
    ///
    /// Returns `Ok(())` once shutdown stops the accept loop; in-flight requests
    /// may still be draining at that point.
    ///
    /// # Errors
    ///
    /// [`ServerError::Tls`] if the certificate or key cannot be loaded,
    /// [`ServerError::Bind`] if the port cannot be bound,
    /// [`ServerError::AlreadyServing`] / [`ServerError::Closed`] if the server
    /// is already running or was shut down.
    pub async fn serve(&self) -> Result<(), ServerError> {
        // Counted by the tracker so that `shutdown` also waits for this loop.
        let _serving = self.connections.token();

        match self.phase() {
            Phase::NotStarted => {}
            Phase::Running => return Err(ServerError::AlreadyServing),
            Phase::ShuttingDown | Phase::Stopped => return Err(ServerError::Closed),
        }

        let tls = tls::load_server_config(&self.opts.cert_file, &self.opts.key_file).await?;
        let addr = self.opts.listen_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let bound = listener.local_addr().unwrap_or(addr);

        let mut claimed = Err(ServerError::Closed);
        self.phase.send_if_modified(|phase| match phase {
            Phase::NotStarted => {
                let _ = self.local_addr.set(bound);
                *phase = Phase::Running;
                claimed = Ok(());
                true
            }
            Phase::Running => {
                claimed = Err(ServerError::AlreadyServing);
                false
            }
            Phase::ShuttingDown | Phase::Stopped => false,
        });
        claimed?;
        info!(addr = %bound, debug = self.opts.debug, "webhook server listening");

        let acceptor = TlsAcceptor::from(tls);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((tcp, peer)) => self.spawn_connection(tcp, peer, acceptor.clone()),
                    Err(e) => {
                        error!(error = %e, "accept error");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        info!(addr = %bound, "webhook server stopped accepting connections");
        Ok(())
    }

    /// [`WebhookServer::serve`], shut down gracefully on SIGINT or SIGTERM.
    ///
    /// Returns the shutdown result if a signal arrives first, or the serve
    /// error (without attempting shutdown) if serving ends first.
    pub async fn serve_gracefully(&self) -> Result<(), ServerError> {
        let mut signals = TerminationSignals::install().map_err(ServerError::Signal)?;
        self.serve_until(async move {
            let name = signals.recv().await;
            info!(signal = name, "signal caught");
        })
        .await
    }

    /// Serve until `signal` resolves, then shut down within the configured
    /// grace period.
    ///
    /// Exactly one of the two wins; the other future is dropped.
    pub async fn serve_until<F>(&self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            res = self.serve() => res,
            () = signal => self.shutdown(self.opts.shutdown_grace()).await,
        }
    }

    /// Stop accepting connections and wait up to `grace` for in-flight
    /// requests to finish.
    ///
    /// Safe to call more than once and from several tasks: later calls wait on
    /// the same drain.
    ///
    /// # Errors
    ///
    /// [`ServerError::ShutdownTimeout`] if requests are still running when
    /// `grace` elapses. They keep running; only the wait is abandoned.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), ServerError> {
        let first = self.phase.send_if_modified(|phase| match phase {
            Phase::NotStarted | Phase::Running => {
                *phase = Phase::ShuttingDown;
                true
            }
            Phase::ShuttingDown | Phase::Stopped => false,
        });
        if first {
            info!(grace = ?grace, open = self.connections.len(), "shutting down webhook server");
            self.shutdown.cancel();
            self.connections.close();
        }

        if tokio::time::timeout(grace, self.connections.wait()).await.is_err() {
            warn!(grace = ?grace, open = self.connections.len(), "graceful shutdown timed out");
            return Err(ServerError::ShutdownTimeout(grace));
        }

        self.phase.send_if_modified(|phase| {
            let draining = *phase == Phase::ShuttingDown;
            if draining {
                *phase = Phase::Stopped;
            }
            draining
        });
        debug!("webhook server stopped");
        Ok(())
    }

    fn spawn_connection(&self, tcp: TcpStream, peer: SocketAddr, acceptor: TlsAcceptor) {
        let router = self.router.clone();
        let shutdown = self.shutdown.clone();

        self.connections.spawn(async move {
            let stream = tokio::select! {
                handshake = acceptor.accept(tcp) => match handshake {
                    Ok(stream) => stream,
                    Err(e) => {
                        debug!(%peer, error = %e, "TLS handshake failed");
                        return;
                    }
                },
                _ = shutdown.cancelled() => return,
            };

            let service = hyper::service::service_fn(move |req: Request<Incoming>| {
                router.clone().call(req)
            });
            let builder = auto::Builder::new(TokioExecutor::new());
            let conn = builder.serve_connection(TokioIo::new(stream), service);
            tokio::pin!(conn);

            let result = tokio::select! {
                res = conn.as_mut() => res,
                _ = shutdown.cancelled() => {
                    conn.as_mut().graceful_shutdown();
                    conn.await
                }
            };
            if let Err(e) = result {
                debug!(%peer, error = %e, "connection closed with error");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::AllowAll;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    fn local_opts() -> ServerOptions {
        ServerOptions {
            bind_addr: [127, 0, 0, 1].into(),
            port: 0,
            cert_file: fixture("tls.crt"),
            key_file: fixture("tls.key"),
            shutdown_grace_secs: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_cert_files_fail_serve() {
        let server = WebhookServer::new(
            ServerOptions {
                cert_file: "/nonexistent/tls.crt".into(),
                key_file: "/nonexistent/tls.key".into(),
                ..local_opts()
            },
            AllowAll,
        );
        let err = server.serve().await.unwrap_err();
        assert!(matches!(err, ServerError::Tls(_)), "{err}");
        assert_eq!(server.phase(), Phase::NotStarted);
    }

    #[tokio::test]
    async fn serve_error_wins_without_shutdown() {
        let server = WebhookServer::new(
            ServerOptions {
                cert_file: "/nonexistent/tls.crt".into(),
                ..local_opts()
            },
            AllowAll,
        );
        let err = server
            .serve_until(std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Tls(_)));
        assert_eq!(server.phase(), Phase::NotStarted);
    }

    #[tokio::test]
    async fn shutdown_before_serve_closes_server() {
        let server = WebhookServer::new(local_opts(), AllowAll);
        server.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(server.phase(), Phase::Stopped);
        assert!(matches!(server.serve().await, Err(ServerError::Closed)));
    }

    #[tokio::test]
    async fn signal_stops_running_server() {
        let server = Arc::new(WebhookServer::new(local_opts(), AllowAll));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let task = tokio::spawn({
            let server = server.clone();
            async move {
                server
                    .serve_until(async move {
                        let _ = rx.await;
                    })
                    .await
            }
        });

        let mut phases = server.subscribe();
        phases.wait_for(|p| *p == Phase::Running).await.unwrap();
        assert!(server.local_addr().is_some());

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("serve_until did not return")
            .unwrap();
        assert!(result.is_ok(), "{result:?}");
        assert_eq!(server.phase(), Phase::Stopped);
    }

    #[tokio::test]
    async fn repeated_shutdown_is_idempotent() {
        let server = Arc::new(WebhookServer::new(local_opts(), AllowAll));
        let serving = tokio::spawn({
            let server = server.clone();
            async move { server.serve().await }
        });
        server
            .subscribe()
            .wait_for(|p| *p == Phase::Running)
            .await
            .unwrap();

        let grace = Duration::from_secs(5);
        let (a, b) = tokio::join!(server.shutdown(grace), server.shutdown(grace));
        assert!(a.is_ok() && b.is_ok());
        assert!(serving.await.unwrap().is_ok());
        assert!(server.shutdown(grace).await.is_ok());
        assert_eq!(server.phase(), Phase::Stopped);
    }

    #[tokio::test]
    async fn second_serve_is_rejected() {
        let server = Arc::new(WebhookServer::new(local_opts(), AllowAll));
        let serving = tokio::spawn({
            let server = server.clone();
            async move { server.serve().await }
        });
        server
            .subscribe()
            .wait_for(|p| *p == Phase::Running)
            .await
            .unwrap();

        assert!(matches!(
            server.serve().await,
            Err(ServerError::AlreadyServing)
        ));

        server.shutdown(Duration::from_secs(5)).await.unwrap();
        assert!(serving.await.unwrap().is_ok());
    }
}
