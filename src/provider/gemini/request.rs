use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::GatewayError;
use crate::protocol::anthropic::{tool_result_text, ContentBlock, ImageSource, MessagesRequest};
use crate::protocol::gemini::{
    Content, FunctionCall, FunctionCallingConfig, FunctionDeclaration, FunctionResponse,
    GeminiTool, GenerateContentRequest, GenerationConfig, InlineData, Part, ToolConfig,
};
use crate::protocol::mapping::{anthropic_role_to_gemini, tool_choice_to_gemini};
use crate::provider::limits::GEMINI_LIMITS;
use crate::provider::schema::sanitize_for_gemini;

/// Name used for a function response whose originating call is not in the
/// conversation.
const UNKNOWN_TOOL_NAME: &str = "unknown";

/// Build the `generateContent` body for `request`.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] when the system prompt or any
/// message content cannot be decoded.
pub fn build_generate_request(
    request: &MessagesRequest,
    model: &str,
) -> Result<GenerateContentRequest, GatewayError> {
    let system = request
        .system_text()
        .map_err(|err| GatewayError::InvalidRequest(format!("Invalid system prompt: {err}")))?;

    let mut decoded = Vec::with_capacity(request.messages.len());
    for message in &request.messages {
        let blocks = message.blocks().map_err(|err| {
            GatewayError::InvalidRequest(format!("Invalid message content: {err}"))
        })?;
        decoded.push((message.role, blocks));
    }

    // Function responses must name the function; recover it from the
    // tool_use block with the same id anywhere in the conversation.
    let mut tool_names: FxHashMap<String, String> = FxHashMap::default();
    for (_, blocks) in &decoded {
        for block in blocks {
            if let ContentBlock::ToolUse { id, name, .. } = block {
                tool_names
                    .entry(id.clone())
                    .or_insert_with(|| name.clone());
            }
        }
    }

    let mut contents = Vec::with_capacity(decoded.len());
    for (role, blocks) in decoded {
        let parts: Vec<Part> = blocks
            .into_iter()
            .filter_map(|block| convert_block(block, &tool_names))
            .collect();
        if parts.is_empty() {
            continue;
        }
        contents.push(Content {
            role: Some(anthropic_role_to_gemini(role).to_string()),
            parts,
        });
    }

    let declarations: Vec<FunctionDeclaration> = request
        .tools
        .iter()
        .map(|tool| FunctionDeclaration {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool
                .input_schema
                .as_deref()
                .and_then(|raw| serde_json::from_str::<Value>(raw.get()).ok())
                .map(sanitize_for_gemini),
        })
        .collect();
    let tool_config = if declarations.is_empty() {
        None
    } else {
        request.tool_choice().map(|choice| {
            let (mode, allowed) = tool_choice_to_gemini(&choice);
            ToolConfig {
                function_calling_config: FunctionCallingConfig {
                    mode,
                    allowed_function_names: allowed.map(str::to_string).into_iter().collect(),
                },
            }
        })
    };
    let tools = if declarations.is_empty() {
        Vec::new()
    } else {
        vec![GeminiTool {
            function_declarations: declarations,
        }]
    };

    Ok(GenerateContentRequest {
        contents,
        system_instruction: system.map(|text| Content {
            role: None,
            parts: vec![Part::text(text)],
        }),
        tools,
        tool_config,
        generation_config: Some(GenerationConfig {
            temperature: request.temperature,
            top_p: request.top_p,
            max_output_tokens: GEMINI_LIMITS.clamp(model, request.max_tokens),
            stop_sequences: request.stop_sequences.clone(),
        }),
    })
}

fn convert_block(block: ContentBlock, tool_names: &FxHashMap<String, String>) -> Option<Part> {
    match block {
        ContentBlock::Text { text } if !text.is_empty() => Some(Part::text(text)),
        ContentBlock::Text { .. } | ContentBlock::Unsupported => None,
        ContentBlock::Image {
            source: ImageSource::Base64 { media_type, data },
        } => Some(Part {
            inline_data: Some(InlineData {
                mime_type: media_type,
                data,
            }),
            ..Part::default()
        }),
        ContentBlock::Image {
            source: ImageSource::Url { .. },
        } => {
            tracing::debug!("dropping URL image; Gemini only accepts inline image data");
            None
        }
        ContentBlock::ToolUse { name, input, .. } => Some(Part {
            function_call: Some(FunctionCall {
                name,
                args: input.is_object().then_some(input),
            }),
            ..Part::default()
        }),
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            ..
        } => {
            let name = tool_names
                .get(&tool_use_id)
                .map_or(UNKNOWN_TOOL_NAME, String::as_str)
                .to_string();
            Some(Part {
                function_response: Some(FunctionResponse {
                    name,
                    response: serde_json::json!({"result": tool_result_text(content.as_ref())}),
                }),
                ..Part::default()
            })
        }
    }
}
