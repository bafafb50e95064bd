//! The decision logic seam: what the server calls for every admission request.

use std::{future::Future, pin::Pin};

use common::DecisionRequest;
use tokio_util::sync::CancellationToken;

use crate::response::PatchAccumulator;

/// Future returned by a [`WebhookHandler`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Per-request context passed to the handler.
///
/// The cancellation token fires once the request is finished with, either
/// because the response was produced or because the client went away and the
/// request future was dropped. Handlers that spawn background work should
/// watch it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Context whose request ends when `cancellation` is cancelled.
    pub fn new(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    /// Token cancelled when this request ends.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns `true` once the request has ended.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Admission decision logic.
///
/// The handler inspects `request` and records its decision on `writer`:
/// staged patch operations, a denial, or nothing (allow unchanged). Returning
/// an error answers the API server with HTTP 500.
pub trait WebhookHandler: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        ctx: RequestContext,
        request: &'a DecisionRequest,
        writer: &'a mut PatchAccumulator,
    ) -> HandlerFuture<'a>;
}

/// Allows every request without changes. Used when no handler is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl WebhookHandler for AllowAll {
    fn handle<'a>(
        &'a self,
        _ctx: RequestContext,
        _request: &'a DecisionRequest,
        _writer: &'a mut PatchAccumulator,
    ) -> HandlerFuture<'a> {
        Box::pin(async { Ok(()) })
    }
}

/// A [`WebhookHandler`] backed by a function or closure. See [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap a function returning a boxed future as a [`WebhookHandler`].
///
/// ```ignore
/// let handler = handler_fn(|_ctx, req, writer| {
///     Box::pin(async move {
///         if req.field("operation").and_then(|v| v.as_str()) == Some("DELETE") {
///             writer.deny("deletes are not allowed");
///         }
///         Ok(())
///     })
/// });
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(RequestContext, &'a DecisionRequest, &'a mut PatchAccumulator) -> HandlerFuture<'a>
        + Send
        + Sync
        + 'static,
{
    HandlerFn { f }
}

impl<F> WebhookHandler for HandlerFn<F>
where
    F: for<'a> Fn(RequestContext, &'a DecisionRequest, &'a mut PatchAccumulator) -> HandlerFuture<'a>
        + Send
        + Sync
        + 'static,
{
    fn handle<'a>(
        &'a self,
        ctx: RequestContext,
        request: &'a DecisionRequest,
        writer: &'a mut PatchAccumulator,
    ) -> HandlerFuture<'a> {
        (self.f)(ctx, request, writer)
    }
}
