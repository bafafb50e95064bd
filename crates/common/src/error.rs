//! Request-scoped error types.
//!
//! None of these are fatal to the process: each one terminates only the
//! admission request that produced it.

use thiserror::Error;

/// Failure to turn accumulated patch state into a [`crate::DecisionResponse`].
#[derive(Debug, Error)]
pub enum BuildError {
    /// A value staged through a typed patch call could not be serialized.
    #[error("patch operation #{index} ({op} {path}) has an unencodable value: {source}")]
    Value {
        index: usize,
        op: crate::PatchOp,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The operation list itself could not be encoded.
    #[error("failed to encode JSON patch: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Why an admission request could not be answered with a review.
///
/// Every variant is returned to the API server as HTTP 500 with the display
/// text as the body. A denial is *not* an error.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// The body could not be read or was not an `AdmissionReview`.
    #[error("failed to decode incoming AdmissionReview: {0}")]
    Decode(String),

    /// The caller-supplied handler returned an error.
    #[error("failed to execute webhook handler: {0}")]
    Handler(String),

    /// The staged patch could not be encoded.
    #[error("failed to build admission response: {0}")]
    Build(#[from] BuildError),

    /// The response envelope could not be encoded.
    #[error("failed to encode outgoing AdmissionReview: {0}")]
    Encode(#[source] serde_json::Error),
}

impl AdmissionError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            AdmissionError::Decode(_)
            | AdmissionError::Handler(_)
            | AdmissionError::Build(_)
            | AdmissionError::Encode(_) => 500,
        }
    }
}
