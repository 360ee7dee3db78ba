use std::time::Duration;

use tracing::info;

use crate::error::GatewayError;
use crate::protocol::anthropic::{tool_result_text, ContentBlock, MessagesRequest, Usage};

/// Estimate the number of tokens in `text`.
///
/// Uses a lightweight heuristic (`bytes / 4`, rounded up) so no model
/// vocabulary has to be loaded.
#[must_use]
pub fn estimate_tokens(text: &str) -> u64 {
    (text.len() as u64).div_ceil(4)
}

/// Estimate the input tokens of a client request.
///
/// Sums the system prompt, message text, tool-use inputs, tool-result text
/// and tool definitions. Images are not counted.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] when message content or the
/// system prompt cannot be decoded.
pub fn estimate_request_tokens(request: &MessagesRequest) -> Result<u64, GatewayError> {
    let mut total: u64 = 0;

    let system = request
        .system_text()
        .map_err(|err| GatewayError::InvalidRequest(format!("Invalid system prompt: {err}")))?;
    if let Some(system) = system {
        total += estimate_tokens(&system);
    }

    for message in &request.messages {
        let blocks = message.blocks().map_err(|err| {
            GatewayError::InvalidRequest(format!("Invalid message content: {err}"))
        })?;
        for block in &blocks {
            total += match block {
                ContentBlock::Text { text } => estimate_tokens(text),
                ContentBlock::ToolUse { name, input, .. } => {
                    estimate_tokens(name) + estimate_tokens(&input.to_string())
                }
                ContentBlock::ToolResult { content, .. } => {
                    estimate_tokens(&tool_result_text(content.as_ref()))
                }
                ContentBlock::Image { .. } | ContentBlock::Unsupported => 0,
            };
        }
    }

    for tool in &request.tools {
        total += estimate_tokens(&tool.name);
        if let Some(description) = &tool.description {
            total += estimate_tokens(description);
        }
        if let Some(schema) = &tool.input_schema {
            total += estimate_tokens(schema.get());
        }
    }

    Ok(total)
}

/// Log token usage for a completed request at INFO level.
pub fn log_request_usage(provider: &str, model: &str, usage: Usage, duration: Duration) {
    info!(
        provider = provider,
        model = model,
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        duration_seconds = duration.as_secs_f64(),
        "request completed"
    );
}
