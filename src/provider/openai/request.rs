use crate::error::GatewayError;
use crate::protocol::anthropic::{
    tool_result_text, ContentBlock, ImageSource, Message, MessagesRequest, Role,
};
use crate::protocol::mapping::tool_choice_to_openai;
use crate::protocol::openai::{
    ChatContent, ChatMessage, ChatRequest, ChatTool, ContentPart, FunctionCall, FunctionDef,
    ImageUrl, StreamOptions, ToolCall,
};
use crate::provider::limits::{omits_output_cap, OPENAI_LIMITS};

/// Build the chat-completions body for `request`.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] when the system prompt or any
/// message content cannot be decoded.
pub fn build_chat_request(
    request: &MessagesRequest,
    model: &str,
) -> Result<ChatRequest, GatewayError> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    let system = request
        .system_text()
        .map_err(|err| GatewayError::InvalidRequest(format!("Invalid system prompt: {err}")))?;
    if let Some(system) = system {
        messages.push(ChatMessage::text("system", system));
    }
    for message in &request.messages {
        convert_message(message, &mut messages)?;
    }

    let max_tokens = if omits_output_cap(model) {
        None
    } else {
        OPENAI_LIMITS.clamp(model, request.max_tokens)
    };

    let tools: Vec<ChatTool> = request
        .tools
        .iter()
        .map(|tool| ChatTool {
            type_: "function",
            function: FunctionDef {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        })
        .collect();
    // Backends reject tool_choice without tools.
    let tool_choice = (request.tool_choice.is_some() && !tools.is_empty())
        .then(|| tool_choice_to_openai(request.tool_choice().as_ref()));

    Ok(ChatRequest {
        model: model.to_string(),
        messages,
        max_tokens,
        temperature: request.temperature,
        top_p: request.top_p,
        stream: request.stream,
        tools,
        tool_choice,
        stop: request.stop_sequences.clone(),
        stream_options: request.stream.then_some(StreamOptions {
            include_usage: true,
        }),
    })
}

fn convert_message(message: &Message, out: &mut Vec<ChatMessage>) -> Result<(), GatewayError> {
    let blocks = message
        .blocks()
        .map_err(|err| GatewayError::InvalidRequest(format!("Invalid message content: {err}")))?;
    match message.role {
        Role::User => convert_user_blocks(blocks, out),
        Role::Assistant => convert_assistant_blocks(blocks, out),
    }
    Ok(())
}

/// Tool results become `tool` messages; text and images between them are
/// grouped into user messages so the original order is preserved.
fn convert_user_blocks(blocks: Vec<ContentBlock>, out: &mut Vec<ChatMessage>) {
    let mut parts: Vec<ContentPart> = Vec::new();
    for block in blocks {
        match block {
            ContentBlock::Text { text } => parts.push(ContentPart::Text { text }),
            ContentBlock::Image { source } => parts.push(image_part(&source)),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => {
                flush_user_parts(&mut parts, out);
                out.push(ChatMessage {
                    role: "tool",
                    content: Some(ChatContent::Text(tool_result_text(content.as_ref()))),
                    tool_calls: Vec::new(),
                    tool_call_id: Some(tool_use_id),
                });
            }
            ContentBlock::ToolUse { .. } | ContentBlock::Unsupported => {}
        }
    }
    flush_user_parts(&mut parts, out);
}

fn flush_user_parts(parts: &mut Vec<ContentPart>, out: &mut Vec<ChatMessage>) {
    if parts.is_empty() {
        return;
    }
    let content = if let [ContentPart::Text { .. }] = parts.as_slice() {
        match parts.pop() {
            Some(ContentPart::Text { text }) => ChatContent::Text(text),
            _ => return,
        }
    } else {
        ChatContent::Parts(std::mem::take(parts))
    };
    out.push(ChatMessage {
        role: "user",
        content: Some(content),
        tool_calls: Vec::new(),
        tool_call_id: None,
    });
}

fn image_part(source: &ImageSource) -> ContentPart {
    ContentPart::ImageUrl {
        image_url: ImageUrl {
            url: source.to_url(),
        },
    }
}

fn convert_assistant_blocks(blocks: Vec<ContentBlock>, out: &mut Vec<ChatMessage>) {
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for block in blocks {
        match block {
            ContentBlock::Text { text: part } => text.push_str(&part),
            ContentBlock::ToolUse { id, name, input } => {
                let arguments = if input.is_null() {
                    "{}".to_string()
                } else {
                    input.to_string()
                };
                tool_calls.push(ToolCall {
                    id,
                    type_: "function",
                    function: FunctionCall { name, arguments },
                });
            }
            ContentBlock::Image { .. }
            | ContentBlock::ToolResult { .. }
            | ContentBlock::Unsupported => {}
        }
    }
    if text.is_empty() && tool_calls.is_empty() {
        return;
    }
    out.push(ChatMessage {
        role: "assistant",
        content: (!text.is_empty()).then_some(ChatContent::Text(text)),
        tool_calls,
        tool_call_id: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn request(body: Value) -> MessagesRequest {
        MessagesRequest::from_slice(body.to_string().as_bytes()).unwrap()
    }

    fn wire(body: Value) -> Value {
        let req = request(body);
        let model = if req.model.is_empty() { "gpt-4o".to_string() } else { req.model.clone() };
        serde_json::to_value(build_chat_request(&req, &model).unwrap()).unwrap()
    }

    #[test]
    fn test_say_hi_scenario() {
        let body = wire(json!({
            "model": "gpt-4o",
            "max_tokens": 100,
            "stream": false,
            "messages": [{"role": "user", "content": "Say hi"}]
        }));
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"], json!([{"role": "user", "content": "Say hi"}]));
        assert!(body.get("stream_options").is_none());
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn test_max_tokens_clamped_and_omitted() {
        let clamped = wire(json!({
            "model": "gpt-4", "max_tokens": 999_999,
            "messages": [{"role": "user", "content": "x"}]
        }));
        assert_eq!(clamped["max_tokens"], 8192);

        let uncapped = wire(json!({
            "model": "o3-mini", "max_tokens": 999_999,
            "messages": [{"role": "user", "content": "x"}]
        }));
        assert!(uncapped.get("max_tokens").is_none());

        let zero = wire(json!({
            "model": "gpt-4o", "max_tokens": 0,
            "messages": [{"role": "user", "content": "x"}]
        }));
        assert!(zero.get("max_tokens").is_none());
    }

    #[test]
    fn test_system_and_streaming_options() {
        let body = wire(json!({
            "system": [{"type": "text", "text": "Be "}, {"type": "text", "text": "brief"}],
            "stream": true,
            "stop_sequences": ["END"],
            "temperature": 0.2,
            "messages": [{"role": "user", "content": "x"}]
        }));
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "Be brief"}));
        assert_eq!(body["stream_options"], json!({"include_usage": true}));
        assert_eq!(body["stop"], json!(["END"]));
        assert_eq!(body["temperature"], 0.2);
    }

    #[test]
    fn test_tool_results_split_into_tool_messages() {
        let body = wire(json!({
            "messages": [{"role": "user", "content": [
                {"type": "text", "text": "before"},
                {"type": "tool_result", "tool_use_id": "call_1", "content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]},
                {"type": "tool_result", "tool_use_id": "call_2", "content": "plain", "is_error": true},
                {"type": "text", "text": "after"},
                {"type": "image", "source": {"type": "url", "url": "https://x/y.png"}}
            ]}]
        }));
        assert_eq!(
            body["messages"],
            json!([
                {"role": "user", "content": "before"},
                {"role": "tool", "content": "a\nb", "tool_call_id": "call_1"},
                {"role": "tool", "content": "plain", "tool_call_id": "call_2"},
                {"role": "user", "content": [
                    {"type": "text", "text": "after"},
                    {"type": "image_url", "image_url": {"url": "https://x/y.png"}}
                ]}
            ])
        );
    }

    #[test]
    fn test_assistant_tool_calls() {
        let body = wire(json!({
            "messages": [
                {"role": "user", "content": "list"},
                {"role": "assistant", "content": [
                    {"type": "tool_use", "id": "toolu_1", "name": "ls", "input": {"path": "."}},
                    {"type": "tool_use", "id": "toolu_2", "name": "pwd"}
                ]},
                {"role": "assistant", "content": [
                    {"type": "text", "text": "Part "},
                    {"type": "thinking", "thinking": "..."},
                    {"type": "text", "text": "two"}
                ]}
            ]
        }));
        let assistant = &body["messages"][1];
        assert!(assistant["content"].is_null());
        assert_eq!(assistant["tool_calls"][0]["id"], "toolu_1");
        assert_eq!(assistant["tool_calls"][0]["type"], "function");
        assert_eq!(assistant["tool_calls"][0]["function"]["name"], "ls");
        assert_eq!(
            assistant["tool_calls"][0]["function"]["arguments"],
            "{\"path\":\".\"}"
        );
        assert_eq!(assistant["tool_calls"][1]["function"]["arguments"], "{}");
        assert_eq!(body["messages"][2], json!({"role": "assistant", "content": "Part two"}));
    }

    #[test]
    fn test_base64_image_becomes_data_url() {
        let body = wire(json!({
            "messages": [{"role": "user", "content": [
                {"type": "image", "source": {"type": "base64", "media_type": "image/png", "data": "AAAA"}}
            ]}]
        }));
        assert_eq!(
            body["messages"][0]["content"][0]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn test_tools_and_tool_choice() {
        let body = wire(json!({
            "messages": [{"role": "user", "content": "x"}],
            "tools": [{"name": "ls", "description": "List", "input_schema": {"type": "object", "properties": {}}}],
            "tool_choice": {"type": "tool", "name": "ls"}
        }));
        assert_eq!(
            body["tools"],
            json!([{"type": "function", "function": {
                "name": "ls", "description": "List",
                "parameters": {"type": "object", "properties": {}}
            }}])
        );
        assert_eq!(
            body["tool_choice"],
            json!({"type": "function", "function": {"name": "ls"}})
        );

        let unknown = wire(json!({
            "messages": [{"role": "user", "content": "x"}],
            "tools": [{"name": "ls"}],
            "tool_choice": {"type": "sometimes"}
        }));
        assert_eq!(unknown["tool_choice"], "auto");
    }

    #[test]
    fn test_malformed_content_is_invalid_request() {
        let req = request(json!({"messages": [{"role": "user", "content": 12}]}));
        assert!(matches!(
            build_chat_request(&req, "gpt-4o"),
            Err(GatewayError::InvalidRequest(_))
        ));
    }
}
