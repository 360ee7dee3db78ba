use crate::error::GatewayError;
use crate::protocol::mapping::openai_finish_to_stop_reason;
use crate::protocol::openai::ChatChunk;
use crate::stream::{ClientEvents, StreamState};

/// Transcode one chat-completions chunk.
///
/// Usage is recorded even after the stream has finished, because
/// `include_usage` delivers it on a trailing chunk with no choices.
///
/// # Errors
///
/// Returns [`GatewayError::Translation`] when `data` is not a chunk.
pub fn transcode_chunk(data: &[u8], state: &mut StreamState) -> Result<ClientEvents, GatewayError> {
    let chunk: ChatChunk = serde_json::from_slice(data)
        .map_err(|err| GatewayError::Translation(format!("Invalid chat chunk: {err}")))?;

    let mut out = ClientEvents::new();
    if let Some(usage) = chunk.usage {
        state.record_usage(usage.prompt_tokens, usage.completion_tokens);
    }
    if state.finished {
        return Ok(out);
    }
    state.ensure_started(&mut out);

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(out);
    };
    if let Some(text) = choice.delta.content.as_deref() {
        state.push_text(text, &mut out);
    }
    for call in choice.delta.tool_calls.unwrap_or_default() {
        let (name, arguments) = match &call.function {
            Some(function) => (function.name.as_deref(), function.arguments.as_deref()),
            None => (None, None),
        };
        state.push_tool_call_delta(call.index, call.id.as_deref(), name, arguments, &mut out);
    }
    if let Some(reason) = choice.finish_reason.as_deref().filter(|r| !r.is_empty()) {
        state.finish(openai_finish_to_stop_reason(reason), &mut out);
    }
    Ok(out)
}
