//! Axum router construction.

use axum::Router;
use tower_http::trace::TraceLayer;

use super::{handlers, state::AdapterState};

/// Build the adapter [`Router`].
///
/// Every path and method goes to [`handlers::admit`]; the webhook
/// configuration on the cluster side decides which path is called.
pub fn build(state: AdapterState) -> Router {
    Router::new()
        .fallback(handlers::admit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
