use super::anthropic::{Role, StopReason, ToolChoice};

// ---------------------------------------------------------------------------
// Role mappings
// ---------------------------------------------------------------------------

#[must_use]
pub fn anthropic_role_to_gemini(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

// ---------------------------------------------------------------------------
// Stop reason mappings
// ---------------------------------------------------------------------------

#[must_use]
pub fn openai_finish_to_stop_reason(reason: &str) -> StopReason {
    match reason {
        "tool_calls" => StopReason::ToolUse,
        "length" => StopReason::MaxTokens,
        // stop, content_filter and anything unknown end the turn
        _ => StopReason::EndTurn,
    }
}

/// Gemini reports reasons in upper case; matching ignores case.
#[must_use]
pub fn gemini_finish_to_stop_reason(reason: &str) -> StopReason {
    if reason.eq_ignore_ascii_case("MAX_TOKENS") {
        StopReason::MaxTokens
    } else {
        // STOP, SAFETY, RECITATION and the rest
        StopReason::EndTurn
    }
}

// ---------------------------------------------------------------------------
// Tool choice mappings
// ---------------------------------------------------------------------------

/// `OpenAI` `tool_choice` for a decoded Anthropic choice; unknown shapes become `auto`.
#[must_use]
pub fn tool_choice_to_openai(choice: Option<&ToolChoice>) -> serde_json::Value {
    match choice {
        Some(ToolChoice::Any) => serde_json::Value::from("required"),
        Some(ToolChoice::Off) => serde_json::Value::from("none"),
        Some(ToolChoice::Tool { name }) => serde_json::json!({
            "type": "function",
            "function": {"name": name},
        }),
        Some(ToolChoice::Auto) | None => serde_json::Value::from("auto"),
    }
}

/// Gemini function-calling mode and allow-list for a decoded Anthropic choice.
#[must_use]
pub fn tool_choice_to_gemini(choice: &ToolChoice) -> (&'static str, Option<&str>) {
    match choice {
        ToolChoice::Auto => ("AUTO", None),
        ToolChoice::Off => ("NONE", None),
        ToolChoice::Any => ("ANY", None),
        ToolChoice::Tool { name } => ("ANY", Some(name.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_openai_finish_reasons() {
        assert_eq!(openai_finish_to_stop_reason("stop"), StopReason::EndTurn);
        assert_eq!(
            openai_finish_to_stop_reason("tool_calls"),
            StopReason::ToolUse
        );
        assert_eq!(openai_finish_to_stop_reason("length"), StopReason::MaxTokens);
        assert_eq!(
            openai_finish_to_stop_reason("content_filter"),
            StopReason::EndTurn
        );
        assert_eq!(
            openai_finish_to_stop_reason("function_call"),
            StopReason::EndTurn
        );
        assert_eq!(openai_finish_to_stop_reason(""), StopReason::EndTurn);
    }

    #[test]
    fn test_gemini_finish_reasons() {
        assert_eq!(gemini_finish_to_stop_reason("STOP"), StopReason::EndTurn);
        assert_eq!(
            gemini_finish_to_stop_reason("MAX_TOKENS"),
            StopReason::MaxTokens
        );
        assert_eq!(
            gemini_finish_to_stop_reason("max_tokens"),
            StopReason::MaxTokens
        );
        assert_eq!(gemini_finish_to_stop_reason("SAFETY"), StopReason::EndTurn);
        assert_eq!(
            gemini_finish_to_stop_reason("RECITATION"),
            StopReason::EndTurn
        );
        assert_eq!(
            gemini_finish_to_stop_reason("MALFORMED_FUNCTION_CALL"),
            StopReason::EndTurn
        );
    }

    #[test]
    fn test_roles() {
        assert_eq!(anthropic_role_to_gemini(Role::User), "user");
        assert_eq!(anthropic_role_to_gemini(Role::Assistant), "model");
    }

    #[test]
    fn test_openai_tool_choice() {
        assert_eq!(tool_choice_to_openai(Some(&ToolChoice::Auto)), json!("auto"));
        assert_eq!(
            tool_choice_to_openai(Some(&ToolChoice::Any)),
            json!("required")
        );
        assert_eq!(tool_choice_to_openai(Some(&ToolChoice::Off)), json!("none"));
        assert_eq!(
            tool_choice_to_openai(Some(&ToolChoice::Tool {
                name: "ls".to_string()
            })),
            json!({"type": "function", "function": {"name": "ls"}})
        );
        assert_eq!(tool_choice_to_openai(None), json!("auto"));
    }

    #[test]
    fn test_gemini_tool_choice() {
        assert_eq!(tool_choice_to_gemini(&ToolChoice::Auto), ("AUTO", None));
        assert_eq!(tool_choice_to_gemini(&ToolChoice::Off), ("NONE", None));
        assert_eq!(tool_choice_to_gemini(&ToolChoice::Any), ("ANY", None));
        assert_eq!(
            tool_choice_to_gemini(&ToolChoice::Tool {
                name: "ls".to_string()
            }),
            ("ANY", Some("ls"))
        );
    }
}
