//! Google Gemini `generateContent` backend.
mod request;
mod response;
mod stream;

use http::HeaderMap;

use crate::error::GatewayError;
use crate::protocol::anthropic::{MessagesRequest, MessagesResponse};
use crate::stream::{ClientEvents, StreamState};

use super::{json_headers, serialize_body, OutboundRequest, Provider, ProviderConfig};

pub use request::build_generate_request;
pub use response::convert_generate_response;
pub use stream::transcode_chunk;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    config: ProviderConfig,
}

impl GeminiProvider {
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    /// `{base}/v1beta/models/{model}:generateContent`, or the SSE streaming
    /// method when `stream` is set.
    #[must_use]
    pub fn endpoint(&self, model: &str, stream: bool) -> String {
        let base = self.config.base_url_or(GEMINI_BASE_URL);
        let method = if stream {
            "streamGenerateContent?alt=sse"
        } else {
            "generateContent"
        };
        format!("{base}/v1beta/models/{model}:{method}")
    }
}

impl Provider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    /// The key travels in `x-goog-api-key` so it never shows up in URLs or logs.
    fn headers(&self, api_key: &str) -> HeaderMap {
        let mut headers = json_headers();
        if api_key.is_empty() {
            return headers;
        }
        match http::HeaderValue::from_str(api_key) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert("x-goog-api-key", value);
            }
            Err(_) => {
                tracing::warn!(
                    "gemini api key contains characters not allowed in a header; sending no key"
                );
            }
        }
        headers
    }

    fn transform_request(
        &self,
        request: &MessagesRequest,
        model: &str,
    ) -> Result<OutboundRequest, GatewayError> {
        let body = build_generate_request(request, model)?;
        Ok(OutboundRequest {
            url: self.endpoint(model, request.stream),
            body: serialize_body(&body)?,
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
        convert_generate_response(body, model)
    }
}
