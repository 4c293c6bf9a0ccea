use std::path::{Path, PathBuf};

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::youtube::DEFAULT_LANGUAGES;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Contents of the optional config file
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub request_timeout_secs: Option<u64>,
    pub preferred_languages: Option<Vec<String>>,
}

impl Config {
    /// Load config from ~/.config/ytlearn/config.toml if it exists
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytlearn")
        .join("config.toml")
}

/// Process-wide settings, resolved once at startup and never mutated
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model: String,
    pub gemini_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub preferred_languages: Vec<String>,
}

impl Settings {
    /// Merge the config file with the process environment (`.env` included)
    pub fn resolve(config: Config) -> Self {
        dotenvy::dotenv().ok();
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    /// Environment values win over file values; empty variables count as unset
    pub fn resolve_with(config: Config, env: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Settings {
            model: env("YTLEARN_MODEL")
                .or(config.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_api_key: env("GEMINI_API_KEY").or(config.gemini_api_key),
            anthropic_api_key: env("ANTHROPIC_API_KEY").or(config.anthropic_api_key),
            openai_api_key: env("OPENAI_API_KEY").or(config.openai_api_key),
            youtube_api_key: env("YOUTUBE_API_KEY").or(config.youtube_api_key),
            llm_base_url: config.llm_base_url,
            host: config.host.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env("PORT")
                .and_then(|p| p.parse().ok())
                .or(config.port)
                .unwrap_or(DEFAULT_PORT),
            request_timeout_secs: config.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            preferred_languages: config
                .preferred_languages
                .filter(|langs| !langs.is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect()),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::resolve_with(Config::default(), |_| None)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
model = "claude-sonnet-4-6"
youtube_api_key = "yt-key"
port = 8080
preferred_languages = ["de", "en"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model.as_deref(), Some("claude-sonnet-4-6"));
        assert_eq!(config.youtube_api_key.as_deref(), Some("yt-key"));
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.preferred_languages, Some(vec!["de".to_string(), "en".to_string()]));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.model.is_none());
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(config.port.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "host = \"127.0.0.1\"\nrequest_timeout_secs = 30\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.request_timeout_secs, Some(30));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.preferred_languages, vec!["en", "en-US", "en-GB"]);
        assert!(settings.gemini_api_key.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let config = Config {
            gemini_api_key: Some("from-file".to_string()),
            port: Some(7000),
            ..Config::default()
        };
        let env: HashMap<&str, &str> = [("GEMINI_API_KEY", "from-env"), ("PORT", "9000"), ("YOUTUBE_API_KEY", " ")]
            .into_iter()
            .collect();
        let settings = Settings::resolve_with(config, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.gemini_api_key.as_deref(), Some("from-env"));
        assert_eq!(settings.port, 9000);
        assert!(settings.youtube_api_key.is_none());
    }
}
