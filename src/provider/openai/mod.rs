//! OpenAI-compatible chat-completions backends: `OpenAI` itself, GLM and
//! Ollama. They share request, response and stream handling; an
//! [`EndpointPolicy`] supplies the endpoint and auth differences.
mod request;
mod response;
mod stream;

use http::HeaderMap;

use crate::error::GatewayError;
use crate::protocol::anthropic::{MessagesRequest, MessagesResponse};
use crate::stream::{ClientEvents, StreamState};

use super::{json_headers, serialize_body, OutboundRequest, Provider, ProviderConfig};

pub use request::build_chat_request;
pub use response::convert_chat_response;
pub use stream::transcode_chunk;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GLM_INTERNATIONAL_BASE_URL: &str = "https://api.z.ai/api/paas/v4";
const GLM_CHINA_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointPolicy {
    OpenAi,
    /// Zhipu GLM; `region: china` selects the mainland endpoint.
    Glm,
    /// Local Ollama; sends no credentials.
    Ollama,
}

impl EndpointPolicy {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EndpointPolicy::OpenAi => "openai",
            EndpointPolicy::Glm => "glm",
            EndpointPolicy::Ollama => "ollama",
        }
    }

    fn default_base_url(self, region: &str) -> &'static str {
        match self {
            EndpointPolicy::OpenAi => OPENAI_BASE_URL,
            EndpointPolicy::Glm if region == "china" => GLM_CHINA_BASE_URL,
            EndpointPolicy::Glm => GLM_INTERNATIONAL_BASE_URL,
            EndpointPolicy::Ollama => OLLAMA_BASE_URL,
        }
    }

    /// Path appended to the base URL. Ollama's base is the server root.
    fn path(self) -> &'static str {
        match self {
            EndpointPolicy::OpenAi | EndpointPolicy::Glm => "/chat/completions",
            EndpointPolicy::Ollama => "/v1/chat/completions",
        }
    }

    fn sends_credentials(self) -> bool {
        !matches!(self, EndpointPolicy::Ollama)
    }

    #[must_use]
    pub fn endpoint(self, config: &ProviderConfig) -> String {
        let base = config.base_url_or(self.default_base_url(&config.region));
        let mut url = String::with_capacity(base.len() + self.path().len());
        url.push_str(base);
        url.push_str(self.path());
        url
    }
}

/// Shared OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAiCompatible {
    policy: EndpointPolicy,
    config: ProviderConfig,
}

impl OpenAiCompatible {
    #[must_use]
    pub fn new(policy: EndpointPolicy, config: ProviderConfig) -> Self {
        Self { policy, config }
    }
}

impl Provider for OpenAiCompatible {
    fn name(&self) -> &'static str {
        self.policy.name()
    }

    fn headers(&self, api_key: &str) -> HeaderMap {
        let mut headers = json_headers();
        if self.policy.sends_credentials() {
            match http::HeaderValue::from_str(&format!("Bearer {api_key}")) {
                Ok(value) => {
                    headers.insert(http::header::AUTHORIZATION, value);
                }
                Err(_) => {
                    tracing::warn!(
                        "{} api key contains characters not allowed in a header; sending no Authorization",
                        self.policy.name()
                    );
                }
            }
        }
        headers
    }

    fn transform_request(
        &self,
        request: &MessagesRequest,
        model: &str,
    ) -> Result<OutboundRequest, GatewayError> {
        let chat = build_chat_request(request, model)?;
        Ok(OutboundRequest {
            url: self.policy.endpoint(&self.config),
            body: serialize_body(&chat)?,
        })
    }

    fn transform_stream_chunk(
        &self,
        data: &[u8],
        state: &mut StreamState,
    ) -> Result<ClientEvents, GatewayError> {
        transcode_chunk(data, state)
    }

    fn transform_response(
        &self,
        body: &[u8],
        model: &str,
    ) -> Result<MessagesResponse, GatewayError> {
        convert_chat_response(body, model)
    }
}
