use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::protocol::anthropic::{ContentBlock, MessagesResponse, StopReason, Usage};
use crate::protocol::mapping::openai_finish_to_stop_reason;
use crate::protocol::openai::ChatResponse;
use crate::util::{new_message_id, new_tool_use_id};

/// Convert a complete chat-completions response.
///
/// # Errors
///
/// Returns [`GatewayError::Translation`] when `body` is not a response.
pub fn convert_chat_response(body: &[u8], model: &str) -> Result<MessagesResponse, GatewayError> {
    let parsed: ChatResponse = serde_json::from_slice(body)
        .map_err(|err| GatewayError::Translation(format!("Invalid chat response: {err}")))?;

    let mut response = MessagesResponse::new(new_message_id(), model.to_string());
    response.stop_reason = Some(StopReason::EndTurn);
    if let Some(choice) = parsed.choices.into_iter().next() {
        if let Some(reason) = choice.finish_reason.as_deref() {
            response.stop_reason = Some(openai_finish_to_stop_reason(reason));
        }
        if let Some(text) = choice.message.content.filter(|text| !text.is_empty()) {
            response.content.push(ContentBlock::Text { text });
        }
        for call in choice.message.tool_calls.unwrap_or_default() {
            let input = parse_arguments(&call.function.name, &call.function.arguments);
            let id = if call.id.is_empty() {
                new_tool_use_id()
            } else {
                call.id
            };
            response.content.push(ContentBlock::ToolUse {
                id,
                name: call.function.name,
                input,
            });
        }
    }
    if let Some(usage) = parsed.usage {
        response.usage = Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        };
    }
    Ok(response)
}

/// Decode tool-call arguments; blank or unparseable arguments become `{}`.
fn parse_arguments(name: &str, arguments: &str) -> Value {
    if arguments.trim().is_empty() {
        return Value::Object(Map::new());
    }
    match serde_json::from_str::<Value>(arguments) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) | Err(_) => {
            tracing::warn!(
                "tool call '{name}' returned arguments that are not a JSON object; forwarding empty input"
            );
            Value::Object(Map::new())
        }
    }
}
