use std::sync::LazyLock;

use regex_lite::{Captures, Regex};

use super::AppConfig;

static ENV_VAR_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").ok());

/// Environment variables consulted when a provider has no key in the file.
const API_KEY_ENV_VARS: &[(&str, &str)] = &[
    ("openai", "OPENAI_API_KEY"),
    ("gemini", "GEMINI_API_KEY"),
    ("glm", "GLM_API_KEY"),
];

/// Replace `${VAR}` and `$VAR` references using `lookup`.
///
/// References to unset variables are left untouched.
pub fn expand_env_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let Some(pattern) = ENV_VAR_PATTERN.as_ref() else {
        return input.to_string();
    };
    pattern
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            lookup(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Fill empty or unexpanded API keys from the well-known environment variables.
pub fn resolve_api_keys<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (provider, env_var) in API_KEY_ENV_VARS {
        let Some(settings) = config.providers.get_mut(*provider) else {
            continue;
        };
        if !settings.api_key.is_empty() && !settings.api_key.contains("${") {
            continue;
        }
        if let Some(value) = lookup(env_var).filter(|value| !value.is_empty()) {
            settings.api_key = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderSettings;

    fn env(name: &str) -> Option<String> {
        match name {
            "HOME_DIR" => Some("/home/me".to_string()),
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            "GLM_API_KEY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn test_expands_braced_and_bare_references() {
        assert_eq!(
            expand_env_vars("a: ${HOME_DIR}/x\nb: $HOME_DIR", env),
            "a: /home/me/x\nb: /home/me"
        );
    }

    #[test]
    fn test_unset_reference_is_kept_verbatim() {
        assert_eq!(
            expand_env_vars("key: ${MISSING_KEY}", env),
            "key: ${MISSING_KEY}"
        );
        assert_eq!(expand_env_vars("cost: $5", env), "cost: $5");
    }

    #[test]
    fn test_resolves_missing_keys_from_env() {
        let mut config = AppConfig::default();
        resolve_api_keys(&mut config, env);
        assert_eq!(config.providers["openai"].api_key, "sk-env");
        assert!(config.providers["gemini"].api_key.is_empty());
        // Empty env values do not count.
        assert!(config.providers["glm"].api_key.is_empty());
    }

    #[test]
    fn test_explicit_key_wins_over_env() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".to_string(),
            ProviderSettings {
                api_key: "sk-file".to_string(),
                ..ProviderSettings::default()
            },
        );
        resolve_api_keys(&mut config, env);
        assert_eq!(config.providers["openai"].api_key, "sk-file");
    }

    #[test]
    fn test_unexpanded_placeholder_is_replaced() {
        let mut config = AppConfig::default();
        if let Some(settings) = config.providers.get_mut("openai") {
            settings.api_key = "${OPENAI_KEY_NOT_SET}".to_string();
        }
        resolve_api_keys(&mut config, env);
        assert_eq!(config.providers["openai"].api_key, "sk-env");
    }
}
