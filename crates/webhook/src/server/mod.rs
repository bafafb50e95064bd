//! HTTPS serving of the admission endpoint.
//!
//! # Responsibilities
//! - Decode AdmissionReview requests, run the handler, encode the reply (`handlers`).
//! - Route every path and method to that handler (`router`).
//! - Load the TLS certificate and key (`tls`).
//! - Run the listener and drain it on shutdown or SIGINT/SIGTERM (`lifecycle`).

pub mod handlers;
pub mod lifecycle;
pub mod router;
pub(crate) mod signal;
pub mod state;
pub mod tls;

pub use lifecycle::{Phase, WebhookServer};
