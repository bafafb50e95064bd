//! AdmissionReview wire types and request-scoped errors shared across the
//! admission webhook crates.

pub mod error;
pub mod protocol;

pub use error::{AdmissionError, BuildError};
pub use protocol::{
    DecisionRequest, DecisionResponse, PatchOp, PatchOperation, PatchType, RequestReview,
    ResponseReview, Status, TypeMeta,
};
