//! Configuration management for lyricgen.
//!
//! Configuration is loaded from `~/.config/lyricgen/config.toml`. The API key
//! is taken from the file or, preferably, from `OPENAI_API_KEY`, and is read
//! exactly once at startup into a [`ClientConfig`].

use crate::completion::Mode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the bearer token.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Initial values for the input form.
    #[serde(default)]
    pub defaults: FormDefaults,
}

/// Settings for the chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Endpoint URL (default: the OpenAI chat-completions URL).
    #[serde(default = "default_api_url")]
    pub url: String,
    /// Model name (default: gpt-3.5-turbo).
    #[serde(default = "default_model")]
    pub model: String,
    /// API key (prefer OPENAI_API_KEY env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in seconds. Absent means the call waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            model: default_model(),
            api_key: None,
            timeout_secs: None,
        }
    }
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

/// Initial form values shown when the shell starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefaults {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_max_tokens() -> u32 {
    1
}

/// Everything the completion client needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("lyricgen"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the log file path used while the TUI owns the terminal.
    pub fn log_path() -> Result<PathBuf> {
        dirs::cache_dir()
            .map(|p| p.join("lyricgen").join("lyricgen.log"))
            .context("Could not determine cache directory")
    }

    /// Load configuration from file, using defaults if not found.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Resolve the client settings, reading the environment credential.
    pub fn client_config(&self) -> ClientConfig {
        self.client_config_with(std::env::var(API_KEY_ENV).ok())
    }

    /// Resolve the client settings against an explicit environment key.
    /// The key in the config file wins over the environment.
    pub fn client_config_with(&self, env_key: Option<String>) -> ClientConfig {
        ClientConfig {
            url: self.api.url.clone(),
            model: self.api.model.clone(),
            api_key: self.api.api_key.clone().or(env_key),
            timeout: self.api.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.model, "gpt-3.5-turbo");
        assert_eq!(config.api.url, "https://api.openai.com/v1/chat/completions");
        assert!(config.api.timeout_secs.is_none());
        assert_eq!(config.defaults.mode, Mode::Song);
        assert_eq!(config.defaults.max_tokens, 1);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("gpt-3.5-turbo"));
        assert!(toml.contains("mode = \"song\""));
        assert!(!toml.contains("api_key"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
[api]
model = "gpt-4o-mini"
timeout_secs = 45

[defaults]
mode = "poem"
max_tokens = 120
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.model, "gpt-4o-mini");
        assert_eq!(config.api.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(config.defaults.mode, Mode::Poem);
        assert_eq!(config.defaults.max_tokens, 120);

        let client = config.client_config_with(None);
        assert_eq!(client.timeout, Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_rejects_unknown_mode() {
        let toml = r#"
[defaults]
mode = "haiku"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_api_key_precedence() {
        let mut config = Config::default();
        let client = config.client_config_with(Some("env-key".to_string()));
        assert_eq!(client.api_key.as_deref(), Some("env-key"));

        config.api.api_key = Some("file-key".to_string());
        let client = config.client_config_with(Some("env-key".to_string()));
        assert_eq!(client.api_key.as_deref(), Some("file-key"));

        config.api.api_key = None;
        assert!(config.client_config_with(None).api_key.is_none());
    }
}
