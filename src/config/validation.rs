use super::{AppConfig, ConfigError, ProviderSettings};

/// Provider names the gateway knows how to construct.
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "gemini", "glm", "ollama"];

const VALID_REGIONS: &[&str] = &["", "international", "china"];

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_providers(config)?;
    validate_active_provider(config)?;
    validate_log_settings(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "server.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    if server.host.trim().is_empty() {
        return Err(validation_err("server.host cannot be empty"));
    }
    Ok(())
}

fn validate_providers(config: &AppConfig) -> Result<(), ConfigError> {
    for (name, settings) in &config.providers {
        if !KNOWN_PROVIDERS.contains(&name.as_str()) {
            return Err(validation_err(format!(
                "unknown provider '{name}'. Must be one of: {}",
                KNOWN_PROVIDERS.join(", ")
            )));
        }
        validate_provider_settings(name, settings)?;
    }
    Ok(())
}

fn validate_provider_settings(name: &str, settings: &ProviderSettings) -> Result<(), ConfigError> {
    let base_url = settings.base_url.trim();
    if !base_url.is_empty() {
        let parsed = url::Url::parse(base_url).map_err(|err| {
            validation_err(format!(
                "Provider '{name}': base_url is not a valid URL: {err}"
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(validation_err(format!(
                "Provider '{name}': base_url must use http:// or https://"
            )));
        }
    }
    if !VALID_REGIONS.contains(&settings.region.as_str()) {
        return Err(validation_err(format!(
            "Provider '{name}': region must be 'international' or 'china'"
        )));
    }
    Ok(())
}

fn validate_active_provider(config: &AppConfig) -> Result<(), ConfigError> {
    let active = config.router.provider.as_str();
    if config.providers.contains_key(active) {
        return Ok(());
    }
    Err(validation_err(format!(
        "router.provider '{active}' has no entry under providers"
    )))
}

fn validate_log_settings(config: &AppConfig) -> Result<(), ConfigError> {
    let valid_levels = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];
    if !valid_levels.contains(&config.features.log_level.to_uppercase().as_str()) {
        return Err(validation_err(format!(
            "log_level must be one of {valid_levels:?}"
        )));
    }
    if !matches!(config.features.log_format.as_str(), "text" | "json") {
        return Err(validation_err("log_format must be 'text' or 'json'"));
    }
    Ok(())
}
