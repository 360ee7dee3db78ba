use crate::config::{AppConfig, ProviderSettings};
use crate::error::GatewayError;
use crate::transport::HttpTransport;

/// Shared application state accessible to all handlers.
///
/// Built once at startup and never mutated; requests only read from it.
pub struct AppState {
    pub config: AppConfig,
    pub transport: HttpTransport,
}

impl AppState {
    /// Build state with a transport configured from `config.server`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: AppConfig) -> Result<Self, GatewayError> {
        let transport = HttpTransport::new(&config.server)?;
        Ok(Self { config, transport })
    }

    /// Resolve which provider serves a request: the one named in the path,
    /// or the active provider.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unconfigured path provider
    /// and [`GatewayError::Config`] when the active provider has no settings.
    pub fn resolve_provider(
        &self,
        path_provider: Option<&str>,
    ) -> Result<(&str, &ProviderSettings), GatewayError> {
        match path_provider {
            Some(name) => self
                .config
                .provider(name)
                .ok_or_else(|| GatewayError::NotFound(format!("Unknown provider: {name}"))),
            None => self.config.active_provider().ok_or_else(|| {
                GatewayError::Config(format!(
                    "Provider '{}' is not configured",
                    self.config.router.provider
                ))
            }),
        }
    }

    #[must_use]
    pub fn active_provider_name(&self) -> &str {
        &self.config.router.provider
    }

    /// Configured provider names in sorted order.
    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.config.providers.keys().map(String::as_str)
    }
}
