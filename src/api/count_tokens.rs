use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::GatewayError;
use crate::observability::token_counter::estimate_request_tokens;
use crate::protocol::anthropic::MessagesRequest;
use crate::state::AppState;

/// Handle `POST /v1/messages/count_tokens`.
///
/// Nothing is sent to a provider; the count is a local estimate.
pub fn count_tokens_handler(
    state: &AppState,
    path_provider: Option<&str>,
    body: &[u8],
) -> Response {
    match count(state, path_provider, body) {
        Ok(input_tokens) => Json(json!({ "input_tokens": input_tokens })).into_response(),
        Err(err) => err.into_response(),
    }
}

fn count(state: &AppState, path_provider: Option<&str>, body: &[u8]) -> Result<u64, GatewayError> {
    let request = MessagesRequest::from_slice(body)
        .map_err(|err| GatewayError::InvalidRequest(format!("Invalid JSON: {err}")))?;
    if path_provider.is_some() {
        state.resolve_provider(path_provider)?;
    }
    estimate_request_tokens(&request)
}

