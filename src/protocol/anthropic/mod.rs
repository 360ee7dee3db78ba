use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

/// Anthropic Messages API request wire type.
///
/// `system`, `tool_choice` and each message's `content` stay raw until a
/// provider transformer asks for them, since their shape varies by caller.
#[derive(Debug, Deserialize)]
pub struct MessagesRequest {
    #[serde(default)]
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub system: Option<Box<RawValue>>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub tool_choice: Option<Box<RawValue>>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
    #[serde(default)]
    pub stream: bool,
}

impl MessagesRequest {
    /// Decode a request body.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body is not a valid request.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Decoded system prompt, if any.
    ///
    /// # Errors
    ///
    /// Fails when `system` is neither a string nor a list of blocks.
    pub fn system_text(&self) -> Result<Option<String>, serde_json::Error> {
        self.system.as_deref().map_or(Ok(None), parse_system)
    }

    /// Decoded `tool_choice`; unrecognized shapes yield `None`.
    #[must_use]
    pub fn tool_choice(&self) -> Option<ToolChoice> {
        self.tool_choice.as_deref().and_then(parse_tool_choice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Anthropic message wire type.
#[derive(Debug, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Box<RawValue>,
}

impl Message {
    /// Decode `content` into blocks.
    ///
    /// # Errors
    ///
    /// Fails when `content` is neither a string nor a list of known blocks.
    pub fn blocks(&self) -> Result<Vec<ContentBlock>, serde_json::Error> {
        parse_content(&self.content)
    }
}

/// A content block in a request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        source: ImageSource,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Value>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Blocks this gateway does not forward (thinking, documents, server tools).
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

impl ImageSource {
    /// `data:` URL for inline images, the URL itself otherwise.
    #[must_use]
    pub fn to_url(&self) -> String {
        match self {
            ImageSource::Base64 { media_type, data } => format!("data:{media_type};base64,{data}"),
            ImageSource::Url { url } => url.clone(),
        }
    }
}

/// Anthropic tool definition.
#[derive(Debug, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<Box<RawValue>>,
}

/// Decoded `tool_choice`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    Any,
    #[serde(rename = "none")]
    Off,
    Tool { name: String },
}

/// Parse message content: a plain string first, then a list of blocks.
///
/// # Errors
///
/// Returns the list-decoding error when neither shape matches.
pub fn parse_content(raw: &RawValue) -> Result<Vec<ContentBlock>, serde_json::Error> {
    if let Ok(text) = serde_json::from_str::<String>(raw.get()) {
        return Ok(vec![ContentBlock::Text { text }]);
    }
    serde_json::from_str(raw.get())
}

/// Parse a system prompt given as a string or a list of text blocks.
///
/// Text blocks are concatenated in order; `null` and empty prompts yield `None`.
///
/// # Errors
///
/// Returns the list-decoding error when neither shape matches.
pub fn parse_system(raw: &RawValue) -> Result<Option<String>, serde_json::Error> {
    if raw.get() == "null" {
        return Ok(None);
    }
    let mut text = String::new();
    for block in parse_content(raw)? {
        if let ContentBlock::Text { text: part } = block {
            text.push_str(&part);
        }
    }
    Ok((!text.is_empty()).then_some(text))
}

#[must_use]
pub fn parse_tool_choice(raw: &RawValue) -> Option<ToolChoice> {
    serde_json::from_str(raw.get()).ok()
}

/// Flatten `tool_result` content to the text a provider can carry.
///
/// Strings pass through; block lists contribute their text blocks joined by
/// newlines; any other JSON is forwarded in its serialized form.
#[must_use]
pub fn tool_result_text(content: Option<&Value>) -> String {
    match content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(items)) => {
            let mut out = String::new();
            for item in items {
                let is_text = item.get("type").and_then(Value::as_str) == Some("text");
                let Some(text) = item.get("text").and_then(Value::as_str) else {
                    continue;
                };
                if !is_text {
                    continue;
                }
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
            out
        }
        Some(other) => other.to_string(),
    }
}

/// Client-facing stop reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

impl StopReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::ToolUse => "tool_use",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
        }
    }
}

/// Anthropic usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Anthropic Messages API response wire type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub role: Role,
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<StopReason>,
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}

impl MessagesResponse {
    #[must_use]
    pub fn new(id: String, model: String) -> Self {
        Self {
            id,
            type_: "message".to_string(),
            role: Role::Assistant,
            model,
            content: Vec::new(),
            stop_reason: None,
            stop_sequence: None,
            usage: Usage::default(),
        }
    }
}

/// Anthropic SSE stream event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {
        message: MessagesResponse,
    },
    ContentBlockStart {
        index: usize,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: Delta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: MessageDeltaBody,
        usage: DeltaUsage,
    },
    MessageStop,
}

impl StreamEvent {
    /// SSE `event:` name for this payload.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::MessageStart { .. } => "message_start",
            StreamEvent::ContentBlockStart { .. } => "content_block_start",
            StreamEvent::ContentBlockDelta { .. } => "content_block_delta",
            StreamEvent::ContentBlockStop { .. } => "content_block_stop",
            StreamEvent::MessageDelta { .. } => "message_delta",
            StreamEvent::MessageStop => "message_stop",
        }
    }
}

/// Delta variants for content block deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

/// Message delta body (`stop_reason` etc).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeltaBody {
    pub stop_reason: Option<StopReason>,
    pub stop_sequence: Option<String>,
}

/// Usage carried by `message_delta`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DeltaUsage {
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: &Value) -> Box<RawValue> {
        RawValue::from_string(value.to_string()).unwrap()
    }

    #[test]
    fn test_string_content_becomes_single_text_block() {
        let blocks = parse_content(&raw(&json!("Say hi"))).unwrap();
        assert_eq!(
            blocks,
            vec![ContentBlock::Text {
                text: "Say hi".to_string()
            }]
        );
    }

    #[test]
    fn test_block_list_content() {
        let blocks = parse_content(&raw(&json!([
            {"type": "text", "text": "look"},
            {"type": "image", "source": {"type": "base64", "media_type": "image/png", "data": "AAA"}},
            {"type": "tool_use", "id": "toolu_1", "name": "ls", "input": {"path": "."}},
            {"type": "tool_result", "tool_use_id": "toolu_1", "content": "ok", "is_error": true},
            {"type": "thinking", "thinking": "hmm", "signature": "x"}
        ])))
        .unwrap();
        assert_eq!(blocks.len(), 5);
        assert!(matches!(
            &blocks[1],
            ContentBlock::Image { source: ImageSource::Base64 { media_type, .. } } if media_type == "image/png"
        ));
        assert!(matches!(&blocks[2], ContentBlock::ToolUse { input, .. } if input["path"] == "."));
        assert!(matches!(
            &blocks[3],
            ContentBlock::ToolResult { is_error: true, .. }
        ));
        assert_eq!(blocks[4], ContentBlock::Unsupported);
    }

    #[test]
    fn test_malformed_content_is_an_error() {
        assert!(parse_content(&raw(&json!(42))).is_err());
        assert!(parse_content(&raw(&json!([{"type": "text"}]))).is_err());
    }

    #[test]
    fn test_system_string_and_blocks() {
        assert_eq!(
            parse_system(&raw(&json!("be brief"))).unwrap().as_deref(),
            Some("be brief")
        );
        let blocks = json!([
            {"type": "text", "text": "You are "},
            {"type": "text", "text": "helpful", "cache_control": {"type": "ephemeral"}}
        ]);
        assert_eq!(
            parse_system(&raw(&blocks)).unwrap().as_deref(),
            Some("You are helpful")
        );
        assert_eq!(parse_system(&raw(&json!(""))).unwrap(), None);
    }

    #[test]
    fn test_tool_choice_shapes() {
        assert_eq!(
            parse_tool_choice(&raw(&json!({"type": "auto"}))),
            Some(ToolChoice::Auto)
        );
        assert_eq!(
            parse_tool_choice(&raw(&json!({"type": "any"}))),
            Some(ToolChoice::Any)
        );
        assert_eq!(
            parse_tool_choice(&raw(&json!({"type": "none"}))),
            Some(ToolChoice::Off)
        );
        assert_eq!(
            parse_tool_choice(&raw(&json!({"type": "tool", "name": "ls"}))),
            Some(ToolChoice::Tool {
                name: "ls".to_string()
            })
        );
        assert_eq!(parse_tool_choice(&raw(&json!("auto"))), None);
        assert_eq!(parse_tool_choice(&raw(&json!({"type": "magic"}))), None);
    }

    #[test]
    fn test_tool_result_text_flattening() {
        assert_eq!(tool_result_text(None), "");
        assert_eq!(tool_result_text(Some(&json!("done"))), "done");
        assert_eq!(
            tool_result_text(Some(&json!([
                {"type": "text", "text": "line 1"},
                {"type": "image", "source": {"type": "url", "url": "http://x"}},
                {"type": "text", "text": "line 2"}
            ]))),
            "line 1\nline 2"
        );
        assert_eq!(tool_result_text(Some(&json!({"a": 1}))), "{\"a\":1}");
    }

    #[test]
    fn test_request_decoding() {
        let body = br#"{
            "model": "gpt-4o",
            "max_tokens": 100,
            "system": [{"type": "text", "text": "sys"}],
            "messages": [{"role": "user", "content": "Say hi"}],
            "tool_choice": {"type": "any"},
            "stream": true
        }"#;
        let request = MessagesRequest::from_slice(body).unwrap();
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.max_tokens, Some(100));
        assert!(request.stream);
        assert_eq!(request.system_text().unwrap().as_deref(), Some("sys"));
        assert_eq!(request.tool_choice(), Some(ToolChoice::Any));
        assert_eq!(request.messages[0].role, Role::User);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let body = br#"{"messages": [{"role": "system", "content": "x"}]}"#;
        assert!(MessagesRequest::from_slice(body).is_err());
    }

    #[test]
    fn test_response_serialization_shape() {
        let mut response = MessagesResponse::new("msg_1".to_string(), "gpt-4o".to_string());
        response.content.push(ContentBlock::Text {
            text: "hi".to_string(),
        });
        response.stop_reason = Some(StopReason::EndTurn);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"][0], json!({"type": "text", "text": "hi"}));
        assert_eq!(value["stop_reason"], "end_turn");
        assert!(value["stop_sequence"].is_null());
        assert_eq!(value["usage"], json!({"input_tokens": 0, "output_tokens": 0}));
    }
}
