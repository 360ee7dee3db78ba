use serde_json::Value;

use crate::error::GatewayError;
use crate::protocol::gemini::{Candidate, GenerateContentResponse};
use crate::protocol::mapping::gemini_finish_to_stop_reason;
use crate::stream::{ClientEvents, StreamState};

/// Transcode one streamed `generateContent` payload.
///
/// Gemini delivers each function call whole, so every call becomes a
/// complete tool_use block (start, one delta, stop) as soon as it arrives.
///
/// # Errors
///
/// Returns [`GatewayError::Translation`] when `data` is not a response chunk.
pub fn transcode_chunk(data: &[u8], state: &mut StreamState) -> Result<ClientEvents, GatewayError> {
    let chunk: GenerateContentResponse = serde_json::from_slice(data)
        .map_err(|err| GatewayError::Translation(format!("Invalid Gemini chunk: {err}")))?;

    let mut out = ClientEvents::new();
    if let Some(usage) = chunk.usage_metadata {
        state.record_usage(usage.prompt_token_count, usage.candidates_token_count);
    }
    if state.finished {
        return Ok(out);
    }
    state.ensure_started(&mut out);

    let Some(Candidate {
        content,
        finish_reason,
    }) = chunk.candidates.into_iter().next()
    else {
        return Ok(out);
    };
    for part in content.map(|c| c.parts).unwrap_or_default() {
        if part.thought {
            continue;
        }
        if let Some(call) = part.function_call {
            let arguments = call
                .args
                .filter(Value::is_object)
                .map_or_else(|| "{}".to_string(), |args| args.to_string());
            state.push_complete_tool_call(&call.name, &arguments, &mut out);
        } else if let Some(text) = part.text.as_deref() {
            state.push_text(text, &mut out);
        }
    }
    if let Some(reason) = finish_reason.as_deref().filter(|r| !r.is_empty()) {
        state.finish(gemini_finish_to_stop_reason(reason), &mut out);
    }
    Ok(out)
}
