//! Admission webhook engine.
//!
//! A [`WebhookHandler`] inspects each incoming admission request and records
//! its decision on a [`PatchAccumulator`]. [`WebhookServer`] takes care of the
//! rest: TLS, AdmissionReview decoding and encoding, and graceful shutdown.
//!
//! ```no_run
//! use webhook::{handler_fn, ServerOptions, WebhookServer};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let handler = handler_fn(|_ctx, _req, writer| {
//!     Box::pin(async move {
//!         writer.patch_add("/metadata/labels/admitted", "true");
//!         Ok(())
//!     })
//! });
//! let server = WebhookServer::new(ServerOptions::from_env()?, handler);
//! server.serve_gracefully().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod response;
pub mod server;

pub use common::{
    AdmissionError, BuildError, DecisionRequest, DecisionResponse, PatchOp, PatchOperation,
    PatchType, Status,
};
pub use config::ServerOptions;
pub use error::ServerError;
pub use handler::{handler_fn, AllowAll, HandlerFuture, RequestContext, WebhookHandler};
pub use response::PatchAccumulator;
pub use server::{Phase, WebhookServer};
pub use tokio_util::sync::CancellationToken;
