use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check handler.
/// Reports the active provider and every configured provider name.
pub fn health_handler(state: &AppState) -> Json<Value> {
    let providers: Vec<&str> = state.provider_names().collect();
    Json(json!({
        "status": "ok",
        "provider": state.active_provider_name(),
        "providers": providers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_health_lists_active_and_configured_providers() {
        let state = AppState::new(AppConfig::default()).unwrap();
        let Json(body) = health_handler(&state);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["provider"], state.active_provider_name());
        let providers = body["providers"].as_array().unwrap();
        assert!(providers.iter().any(|p| p == "openai"));
        assert!(providers.iter().any(|p| p == "gemini"));
    }
}
