use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::protocol::anthropic::{ContentBlock, MessagesResponse, StopReason, Usage};
use crate::protocol::gemini::GenerateContentResponse;
use crate::protocol::mapping::gemini_finish_to_stop_reason;
use crate::util::{new_message_id, new_tool_use_id};

/// Convert a complete `generateContent` response.
///
/// Adjacent text parts are merged into one text block; thought parts are
/// dropped.
///
/// # Errors
///
/// Returns [`GatewayError::Translation`] when `body` is not a response.
pub fn convert_generate_response(
    body: &[u8],
    model: &str,
) -> Result<MessagesResponse, GatewayError> {
    let parsed: GenerateContentResponse = serde_json::from_slice(body)
        .map_err(|err| GatewayError::Translation(format!("Invalid Gemini response: {err}")))?;

    let mut response = MessagesResponse::new(new_message_id(), model.to_string());
    let mut stop_reason = StopReason::EndTurn;
    if let Some(candidate) = parsed.candidates.into_iter().next() {
        if let Some(reason) = candidate.finish_reason.as_deref() {
            stop_reason = gemini_finish_to_stop_reason(reason);
        }
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        for part in parts {
            if part.thought {
                continue;
            }
            if let Some(call) = part.function_call {
                let input = call
                    .args
                    .filter(Value::is_object)
                    .unwrap_or_else(|| Value::Object(Map::new()));
                response.content.push(ContentBlock::ToolUse {
                    id: new_tool_use_id(),
                    name: call.name,
                    input,
                });
                continue;
            }
            let Some(text) = part.text.filter(|t| !t.is_empty()) else {
                continue;
            };
            match response.content.last_mut() {
                Some(ContentBlock::Text { text: previous }) => previous.push_str(&text),
                _ => response.content.push(ContentBlock::Text { text }),
            }
        }
    }
    response.stop_reason = Some(stop_reason);

    if let Some(usage) = parsed.usage_metadata {
        response.usage = Usage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        };
    }
    Ok(response)
}
