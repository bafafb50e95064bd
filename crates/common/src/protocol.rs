//! `AdmissionReview` envelope types exchanged with the cluster API server.
//!
//! Only the fields the engine needs are typed. The body of an inbound request
//! (object, oldObject, userInfo, ...) is carried verbatim so that handlers see
//! exactly what the API server sent.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// `status.status` value carried by every denial.
pub const STATUS_FAILURE: &str = "Failure";

/// `status.reason` value carried by every denial.
pub const REASON_BAD_REQUEST: &str = "BadRequest";

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// `apiVersion` / `kind` of a review envelope.
///
/// Echoed from request to response without being recomputed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

/// Inbound `AdmissionReview` carrying a single [`DecisionRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestReview {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub request: DecisionRequest,
}

/// Outbound `AdmissionReview` carrying a single [`DecisionResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseReview {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub response: DecisionResponse,
}

impl ResponseReview {
    /// Wrap `response` in an envelope mirroring the request's type metadata.
    pub fn reply_to(request: &RequestReview, response: DecisionResponse) -> Self {
        Self {
            type_meta: request.type_meta.clone(),
            response,
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// The resource under review.
///
/// `uid` is the only field the engine reads; everything else is kept in
/// [`DecisionRequest::body`] in the order the API server sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    #[serde(default)]
    pub uid: String,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl DecisionRequest {
    /// Look up a top-level request field such as `"object"` or `"operation"`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    /// Deserialize the whole request (uid included) into a handler-defined type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::to_value(self).and_then(serde_json::from_value)
    }
}

// ---------------------------------------------------------------------------
// JSON Patch
// ---------------------------------------------------------------------------

/// RFC 6902 operation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    Copy,
    Move,
    Test,
}

impl std::fmt::Display for PatchOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PatchOp::Add => "add",
            PatchOp::Remove => "remove",
            PatchOp::Replace => "replace",
            PatchOp::Copy => "copy",
            PatchOp::Move => "move",
            PatchOp::Test => "test",
        })
    }
}

/// A single JSON Patch operation.
///
/// `path` and `from` are JSON pointers and are passed through unvalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Encoding of [`DecisionResponse::patch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchType {
    #[serde(rename = "JSONPatch")]
    JsonPatch,
}

/// Result attached to a denied decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub status: String,
    pub message: String,
    pub reason: String,
}

impl Status {
    /// A `Failure` / `BadRequest` status carrying `message`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_FAILURE.into(),
            message: message.into(),
            reason: REASON_BAD_REQUEST.into(),
        }
    }
}

/// The admission decision for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<PatchType>,
    /// JSON-encoded array of [`PatchOperation`]s, base64 on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    pub patch: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_str(&STANDARD.encode(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}
