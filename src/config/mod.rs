pub mod env;
pub mod validation;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use self::env::{expand_env_vars, resolve_api_keys};
use self::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Listener and outbound HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Outbound request timeout in seconds; `0` disables it.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default = "default_http_pool_idle_timeout_secs")]
    pub http_pool_idle_timeout_secs: u64,
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub http_use_env_proxy: bool,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_timeout() -> u64 {
    600
}
fn default_http_pool_max_idle_per_host() -> usize {
    16
}
fn default_http_pool_idle_timeout_secs() -> u64 {
    90
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            timeout: default_timeout(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_pool_idle_timeout_secs: default_http_pool_idle_timeout_secs(),
            base_path: String::new(),
            http_use_env_proxy: false,
        }
    }
}

/// Which provider serves `/v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_active_provider")]
    pub provider: String,
}

fn default_active_provider() -> String {
    "openai".to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            provider: default_active_provider(),
        }
    }
}

/// Settings for one backend, keyed by provider name in [`AppConfig::providers`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub base_url: String,
    /// Only read by GLM: `china` selects the mainland endpoint.
    #[serde(default)]
    pub region: String,
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `text` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub router: RouterConfig,
    /// Entries override the built-in provider of the same name.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderSettings>,
    #[serde(default)]
    pub features: FeaturesConfig,
}

fn default_providers() -> BTreeMap<String, ProviderSettings> {
    let mut providers = BTreeMap::new();
    providers.insert(
        "openai".to_string(),
        ProviderSettings {
            model: "gpt-5.1".to_string(),
            ..ProviderSettings::default()
        },
    );
    providers.insert(
        "gemini".to_string(),
        ProviderSettings {
            model: "gemini-2.5-flash".to_string(),
            ..ProviderSettings::default()
        },
    );
    providers.insert(
        "glm".to_string(),
        ProviderSettings {
            model: "glm-4.7".to_string(),
            region: "international".to_string(),
            ..ProviderSettings::default()
        },
    );
    providers.insert(
        "ollama".to_string(),
        ProviderSettings {
            model: "llama3.1".to_string(),
            base_url: "http://localhost:11434".to_string(),
            ..ProviderSettings::default()
        },
    );
    providers
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            router: RouterConfig::default(),
            providers: default_providers(),
            features: FeaturesConfig::default(),
        }
    }
}

impl AppConfig {
    /// Add the built-in settings for every provider the file does not mention.
    pub fn merge_default_providers(&mut self) {
        for (name, settings) in default_providers() {
            self.providers.entry(name).or_insert(settings);
        }
    }

    /// Settings for the provider serving `/v1/messages`.
    #[must_use]
    pub fn active_provider(&self) -> Option<(&str, &ProviderSettings)> {
        self.provider(&self.router.provider)
    }

    #[must_use]
    pub fn provider(&self, name: &str) -> Option<(&str, &ProviderSettings)> {
        self.providers
            .get_key_value(name)
            .map(|(name, settings)| (name.as_str(), settings))
    }
}

/// Parse, expand and validate configuration from YAML text.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] when parsing fails or
/// [`ConfigError::Validation`] when semantic validation fails.
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let expanded = expand_env_vars(contents, |name| std::env::var(name).ok());
    let mut config: AppConfig = if expanded.trim().is_empty() {
        serde_yaml::from_str("{}")?
    } else {
        serde_yaml::from_str(&expanded)?
    };
    config.merge_default_providers();
    resolve_api_keys(&mut config, |name| std::env::var(name).ok());
    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Load `path` if it exists, otherwise fall back to built-in defaults.
///
/// Returns the config and whether the file was found.
///
/// # Errors
///
/// Same as [`load_config`], except a missing file is not an error.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<(AppConfig, bool), ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok((parse_config(&contents)?, true)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let mut config = AppConfig::default();
            resolve_api_keys(&mut config, |name| std::env::var(name).ok());
            validate_config(&config)?;
            Ok((config, false))
        }
        Err(err) => Err(ConfigError::Io(err)),
    }
}
