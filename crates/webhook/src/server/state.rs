//! Shared state injected into the admission handler.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::handler::{AllowAll, WebhookHandler};

/// State shared across all requests served by one adapter.
///
/// Cheap to clone: every field is `Arc`-backed or `Copy`.
#[derive(Clone)]
pub struct AdapterState {
    /// Caller-supplied decision logic.
    pub handler: Arc<dyn WebhookHandler>,
    /// Dump requests/responses and pretty-print response bodies.
    pub debug: bool,
    /// Serializes debug dumps of this adapter so concurrent requests do not
    /// interleave. Never held across the handler call.
    dump_lock: Arc<Mutex<()>>,
}

impl AdapterState {
    /// Create a new [`AdapterState`] with its own dump lock.
    pub fn new(handler: Arc<dyn WebhookHandler>, debug: bool) -> Self {
        Self {
            handler,
            debug,
            dump_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Log `label` followed by `body` as one uninterrupted block.
    pub(crate) fn dump(&self, label: &str, body: &str) {
        let _guard = self.dump_lock.lock().unwrap_or_else(PoisonError::into_inner);
        info!("{label}:");
        info!("{body}");
    }
}

impl Default for AdapterState {
    /// Allow-everything adapter without debug output, suitable for tests.
    fn default() -> Self {
        Self::new(Arc::new(AllowAll), false)
    }
}

impl std::fmt::Debug for AdapterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterState")
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
