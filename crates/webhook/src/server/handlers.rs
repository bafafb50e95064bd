//! The admission request handler: AdmissionReview in, AdmissionReview out.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use common::{AdmissionError, RequestReview, ResponseReview};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::state::AdapterState;
use crate::handler::RequestContext;
use crate::response::PatchAccumulator;

/// Largest AdmissionReview body accepted. The API server caps requests at
/// 3 MiB of object data; the envelope gets some headroom on top.
pub const MAX_REVIEW_BYTES: usize = 4 * 1024 * 1024;

/// Decide one admission request. Mounted for every method and path.
///
/// Answers `200 OK` with a JSON `AdmissionReview` when the review could be
/// produced (including denials), and `500` with the error text otherwise.
pub async fn admit(State(state): State<AdapterState>, body: Body) -> Response {
    match review(&state, body).await {
        Ok(buf) => json_response(buf),
        Err(e) => {
            warn!(error = %e, "failed to handle admission review");
            let status =
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, e.to_string()).into_response()
        }
    }
}

async fn review(state: &AdapterState, body: Body) -> Result<Vec<u8>, AdmissionError> {
    let raw = axum::body::to_bytes(body, MAX_REVIEW_BYTES)
        .await
        .map_err(|e| AdmissionError::Decode(e.to_string()))?;
    let request: RequestReview =
        serde_json::from_slice(&raw).map_err(|e| AdmissionError::Decode(e.to_string()))?;

    if state.debug {
        let dump = serde_json::to_string_pretty(&request).unwrap_or_default();
        state.dump("Request", &dump);
    }

    let mut writer = PatchAccumulator::new();
    {
        let cancellation = CancellationToken::new();
        let _cancel_on_exit = cancellation.clone().drop_guard();
        state
            .handler
            .handle(RequestContext::new(cancellation), &request.request, &mut writer)
            .await
            .map_err(|e| AdmissionError::Handler(format!("{e:#}")))?;
    }

    let response = writer.build(request.request.uid.clone())?;
    debug!(
        uid = %response.uid,
        allowed = response.allowed,
        patched = response.patch.is_some(),
        "admission review decided"
    );
    let reply = ResponseReview::reply_to(&request, response);

    let buf = if state.debug {
        serde_json::to_vec_pretty(&reply)
    } else {
        serde_json::to_vec(&reply)
    }
    .map_err(AdmissionError::Encode)?;

    if state.debug {
        state.dump("Response", &String::from_utf8_lossy(&buf));
    }
    Ok(buf)
}

fn json_response(buf: Vec<u8>) -> Response {
    let len = HeaderValue::from(buf.len());
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::CONTENT_LENGTH, len),
        ],
        buf,
    )
        .into_response()
}
