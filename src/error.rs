use serde_json::json;

/// Error type shared by every stage of the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Config error: {0}")]
    Config(String),
    #[error("Protocol translation error: {0}")]
    Translation(String),
    #[error("Failed to reach provider: {0}")]
    Transport(String),
    #[error("Provider returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Client-facing error class, rendered as `error.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    Api,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request_error",
            ErrorKind::NotFound => "not_found_error",
            ErrorKind::Api => "api_error",
        }
    }
}

impl GatewayError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::InvalidRequest(_) | GatewayError::MethodNotAllowed => {
                ErrorKind::InvalidRequest
            }
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::Config(_)
            | GatewayError::Translation(_)
            | GatewayError::Transport(_)
            | GatewayError::Upstream { .. }
            | GatewayError::Internal(_) => ErrorKind::Api,
        }
    }

    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => http::StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => http::StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Config(_) | GatewayError::Translation(_) | GatewayError::Internal(_) => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::Transport(_) => http::StatusCode::BAD_GATEWAY,
            // Provider statuses outside the valid range still surface as a gateway failure.
            GatewayError::Upstream { status, .. } => {
                http::StatusCode::from_u16(*status).unwrap_or(http::StatusCode::BAD_GATEWAY)
            }
        }
    }

    /// Message placed in `error.message`.
    ///
    /// Provider failures carry the provider's own status and body verbatim;
    /// everything else uses the variant's display text.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            GatewayError::InvalidRequest(msg)
            | GatewayError::NotFound(msg)
            | GatewayError::Config(msg)
            | GatewayError::Translation(msg)
            | GatewayError::Internal(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Build an Anthropic-format error body.
#[must_use]
pub fn error_payload(kind: ErrorKind, message: &str) -> serde_json::Value {
    json!({
        "type": "error",
        "error": {
            "type": kind.as_str(),
            "message": message,
        }
    })
}

/// Render a `GatewayError` as `(status, JSON body)`.
#[must_use]
pub fn format_error(err: &GatewayError) -> (http::StatusCode, serde_json::Value) {
    (err.status(), error_payload(err.kind(), &err.client_message()))
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = format_error(&self);
        (status, axum::Json(body)).into_response()
    }
}
