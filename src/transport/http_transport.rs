use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::GatewayError;

fn build_reqwest_client(
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Option<Duration>,
    timeout: Option<Duration>,
    use_env_proxy: bool,
) -> Result<reqwest::Client, GatewayError> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(5))
        .redirect(reqwest::redirect::Policy::none());

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    if !use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| GatewayError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// HTTP transport for calls to providers.
///
/// One pooled client is shared by every request; it is cheap to clone and
/// safe to use concurrently. Requests are sent once; nothing is retried.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with connection pooling and timeouts from the given server config.
    ///
    /// A `timeout` of zero disables the overall request timeout; streamed
    /// generations can legitimately run for minutes.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the TLS backend cannot be
    /// initialised.
    pub fn new(config: &ServerConfig) -> Result<Self, GatewayError> {
        let pool_idle_timeout = if config.http_pool_idle_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(config.http_pool_idle_timeout_secs))
        };
        let timeout = (config.timeout > 0).then(|| Duration::from_secs(config.timeout));
        let client = build_reqwest_client(
            config.http_pool_max_idle_per_host.max(1),
            pool_idle_timeout,
            timeout,
            config.http_use_env_proxy,
        )?;
        Ok(Self { client })
    }

    /// POST `body` to `url` and return the response with its body unread.
    ///
    /// The caller decides whether to buffer the body or read it as a stream.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the URL is invalid or the
    /// provider cannot be reached.
    pub async fn post(
        &self,
        url: &str,
        headers: http::HeaderMap,
        body: bytes::Bytes,
    ) -> Result<reqwest::Response, GatewayError> {
        let parsed = url::Url::parse(url)
            .map_err(|err| GatewayError::Transport(format!("Invalid provider URL '{url}': {err}")))?;
        let mut request = reqwest::Request::new(http::Method::POST, parsed);
        *request.headers_mut() = headers;
        *request.body_mut() = Some(reqwest::Body::from(body));

        self.client
            .execute(request)
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))
    }
}
