//! Backend providers.
//!
//! Every backend implements [`Provider`]: it turns a client request into an
//! outbound HTTP call and turns the backend's replies (whole bodies or one
//! SSE payload at a time) back into client format. The OpenAI-compatible
//! backends share one implementation and differ only in their
//! [`openai::EndpointPolicy`].
pub mod gemini;
pub mod limits;
pub mod openai;
pub mod schema;

use bytes::Bytes;
use http::HeaderMap;

use crate::config::ProviderSettings;
use crate::error::GatewayError;
use crate::protocol::anthropic::{MessagesRequest, MessagesResponse};
use crate::stream::{ClientEvents, StreamState};

pub use gemini::GeminiProvider;
pub use openai::{EndpointPolicy, OpenAiCompatible};

/// A fully built outbound call: always a `POST` of a JSON body.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub body: Bytes,
}

/// Resolved settings for one provider, fixed for the lifetime of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub region: String,
}

impl From<&ProviderSettings> for ProviderConfig {
    fn from(settings: &ProviderSettings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            base_url: settings.base_url.clone(),
            region: settings.region.clone(),
        }
    }
}

impl ProviderConfig {
    /// Configured base URL without a trailing slash, or `default`.
    #[must_use]
    pub fn base_url_or<'a>(&'a self, default: &'a str) -> &'a str {
        let configured = self.base_url.trim_end_matches('/');
        if configured.is_empty() {
            default
        } else {
            configured
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Glm,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Gemini,
        ProviderKind::Glm,
        ProviderKind::Ollama,
    ];

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Glm => "glm",
            ProviderKind::Ollama => "ollama",
        }
    }
}

pub trait Provider: Send + Sync {
    /// Stable lowercase name used for config lookup and logging.
    fn name(&self) -> &'static str;

    /// Headers for the outbound call, including auth where the backend uses it.
    fn headers(&self, api_key: &str) -> HeaderMap;

    /// Build the backend request for `request`, targeting `model`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] when client content cannot
    /// be decoded.
    fn transform_request(
        &self,
        request: &MessagesRequest,
        model: &str,
    ) -> Result<OutboundRequest, GatewayError>;

    /// Transcode one streamed `data:` payload into client events.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Translation`] when the payload is not a valid
    /// chunk. `state` is left untouched in that case.
    fn transform_stream_chunk(
        &self,
        data: &[u8],
        state: &mut StreamState,
    ) -> Result<ClientEvents, GatewayError>;

    /// Convert a complete non-streaming response body.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Translation`] when the body is not a valid
    /// response.
    fn transform_response(&self, body: &[u8], model: &str)
        -> Result<MessagesResponse, GatewayError>;
}

/// Construct the provider registered under `name`.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] for names no backend is registered under.
pub fn build_provider(
    name: &str,
    config: ProviderConfig,
) -> Result<Box<dyn Provider>, GatewayError> {
    let kind = ProviderKind::from_name(name)
        .ok_or_else(|| GatewayError::Config(format!("Unknown provider: {name}")))?;
    Ok(match kind {
        ProviderKind::OpenAi => Box::new(OpenAiCompatible::new(EndpointPolicy::OpenAi, config)),
        ProviderKind::Glm => Box::new(OpenAiCompatible::new(EndpointPolicy::Glm, config)),
        ProviderKind::Ollama => Box::new(OpenAiCompatible::new(EndpointPolicy::Ollama, config)),
        ProviderKind::Gemini => Box::new(GeminiProvider::new(config)),
    })
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    headers
}

fn serialize_body<T: serde::Serialize>(body: &T) -> Result<Bytes, GatewayError> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .map_err(|err| GatewayError::Internal(format!("Failed to encode request: {err}")))
}
