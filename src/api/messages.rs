use std::sync::Arc;
use std::time::Instant;

use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;

use super::streaming::stream_response;
use crate::error::GatewayError;
use crate::observability::{log_request_complete, log_request_start};
use crate::protocol::anthropic::MessagesRequest;
use crate::provider::{build_provider, ProviderConfig};
use crate::state::AppState;

/// Handle `POST /v1/messages` and `POST /{provider}/v1/messages`.
///
/// Failures are rendered as Anthropic error bodies; a provider's own error
/// status and body are passed through unchanged.
pub async fn messages_handler(
    state: Arc<AppState>,
    path_provider: Option<&str>,
    body: Bytes,
) -> Response {
    match forward(&state, path_provider, body).await {
        Ok(response) => response,
        Err(err) => {
            if err.status().is_server_error() {
                tracing::warn!(error = %err, "request failed");
            } else {
                tracing::debug!(error = %err, "request rejected");
            }
            err.into_response()
        }
    }
}

async fn forward(
    state: &AppState,
    path_provider: Option<&str>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let request = MessagesRequest::from_slice(&body)
        .map_err(|err| GatewayError::InvalidRequest(format!("Invalid JSON: {err}")))?;
    let (provider_name, settings) = state.resolve_provider(path_provider)?;

    let config = ProviderConfig::from(settings);
    let model = if request.model.is_empty() {
        config.model.clone()
    } else {
        request.model.clone()
    };
    let provider = build_provider(provider_name, config)?;

    log_request_start(
        provider.name(),
        &model,
        request.stream,
        request.messages.len(),
    );
    let outbound = provider.transform_request(&request, &model)?;
    let headers = provider.headers(&settings.api_key);

    let start = Instant::now();
    let upstream = state
        .transport
        .post(&outbound.url, headers, outbound.body)
        .await?;

    let status = upstream.status();
    if !status.is_success() {
        let body = upstream.text().await.unwrap_or_default();
        tracing::warn!(
            provider = provider.name(),
            status = status.as_u16(),
            body = %body,
            "provider returned an error"
        );
        return Err(GatewayError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    if request.stream {
        return Ok(stream_response(provider, upstream, model, start));
    }

    let body = upstream
        .bytes()
        .await
        .map_err(|err| GatewayError::Transport(format!("Failed to read provider response: {err}")))?;
    let message = provider.transform_response(&body, &model)?;
    log_request_complete(provider.name(), &model, message.usage, start);
    Ok(Json(message).into_response())
}
