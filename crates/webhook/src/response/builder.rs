//! Turns a finished [`PatchAccumulator`] into a [`DecisionResponse`].

use common::{BuildError, DecisionResponse, PatchType, Status};

use super::accumulator::PatchAccumulator;

/// Build the decision for request `uid`.
///
/// A non-empty deny message always wins: the response is a `BadRequest`
/// failure and staged operations are dropped without being encoded.
pub(super) fn build(state: PatchAccumulator, uid: String) -> Result<DecisionResponse, BuildError> {
    let PatchAccumulator {
        operations,
        unencodable,
        deny,
    } = state;

    if !deny.is_empty() {
        return Ok(DecisionResponse {
            uid,
            allowed: false,
            patch_type: None,
            patch: None,
            status: Some(Status::bad_request(deny)),
        });
    }

    if let Some(err) = unencodable {
        return Err(err);
    }

    let (patch_type, patch) = if operations.is_empty() {
        (None, None)
    } else {
        let encoded = serde_json::to_vec(&operations).map_err(BuildError::Encode)?;
        (Some(PatchType::JsonPatch), Some(encoded))
    };

    Ok(DecisionResponse {
        uid,
        allowed: true,
        patch_type,
        patch,
        status: None,
    })
}
