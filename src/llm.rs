use async_trait::async_trait;
use log::{debug, info};
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::Settings;
use crate::error::PipelineError;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{0} API key not configured")]
    MissingCredential(&'static str),
    #[error("{provider} API returned {status}: {body}")]
    Api {
        provider: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("{0}")]
    Transport(String),
    #[error("unexpected {0} API response format")]
    Malformed(&'static str),
}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        GenerateError::Transport(err.to_string())
    }
}

impl GenerateError {
    /// Classify for the envelope; `what` names the artifact being generated
    pub fn into_pipeline(self, what: &str) -> PipelineError {
        let message = self.to_string();
        match self {
            GenerateError::MissingCredential(_) => PipelineError::api_key(message),
            _ => PipelineError::server(format!("Failed to generate {what}: {message}")),
        }
    }
}

/// A backend that turns a prompt into free-form text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

/// Which hosted API serves a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Anthropic,
    OpenAi,
}

impl Provider {
    pub fn for_model(model: &str) -> Provider {
        if model.starts_with("claude") {
            Provider::Anthropic
        } else if model.starts_with("gpt") || model.starts_with("o1") || model.starts_with("o3") {
            Provider::OpenAi
        } else {
            Provider::Gemini
        }
    }

    fn name(self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Anthropic => "Anthropic",
            Provider::OpenAi => "OpenAI",
        }
    }

    fn default_base(self) -> &'static str {
        match self {
            Provider::Gemini => GEMINI_API_BASE,
            Provider::Anthropic => ANTHROPIC_API_BASE,
            Provider::OpenAi => OPENAI_API_BASE,
        }
    }
}

/// True for keys nobody has filled in yet
pub fn is_placeholder(key: &str) -> bool {
    let key = key.trim();
    key.is_empty()
        || key.eq_ignore_ascii_case("changeme")
        || (key.starts_with("your-") && key.ends_with("-here"))
        || (key.starts_with('<') && key.ends_with('>'))
}

/// `AIzaS...xyz9` form for logs
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let head: String = chars.iter().take(5).collect();
    if chars.len() > 9 {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        format!("{head}...")
    }
}

/// HTTP client for the configured model; credential is fixed at construction
#[derive(Debug, Clone)]
pub struct ModelClient {
    client: reqwest::Client,
    provider: Provider,
    model: String,
    api_key: Option<String>,
    base_url: String,
}

impl ModelClient {
    pub fn new(client: reqwest::Client, model: impl Into<String>, api_key: Option<String>) -> Self {
        let model = model.into();
        let provider = Provider::for_model(&model);
        Self {
            client,
            provider,
            model,
            api_key: api_key.filter(|k| !is_placeholder(k)),
            base_url: provider.default_base().to_string(),
        }
    }

    pub fn from_settings(client: reqwest::Client, settings: &Settings) -> Self {
        let provider = Provider::for_model(&settings.model);
        let api_key = match provider {
            Provider::Gemini => settings.gemini_api_key.clone(),
            Provider::Anthropic => settings.anthropic_api_key.clone(),
            Provider::OpenAi => settings.openai_api_key.clone(),
        };
        let model_client = Self::new(client, settings.model.clone(), api_key);
        match &settings.llm_base_url {
            Some(base) => model_client.with_base_url(base.clone()),
            None => model_client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn post(&self, request: reqwest::RequestBuilder) -> Result<serde_json::Value, GenerateError> {
        let resp = request
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerateError::Api {
                provider: self.provider.name(),
                status,
                body,
            });
        }

        Ok(resp.json().await?)
    }

    async fn generate_gemini(&self, api_key: &str, prompt: &str) -> Result<String, GenerateError> {
        let url = format!("{}/models/{}:generateContent?key={api_key}", self.base_url, self.model);
        let body = serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ]
        });
        let json = self.post(self.client.post(&url).json(&body)).await?;
        extract_gemini_text(&json)
    }

    async fn generate_anthropic(&self, api_key: &str, prompt: &str) -> Result<String, GenerateError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 4096,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });
        let request = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body);
        let json = self.post(request).await?;
        extract_anthropic_text(&json)
    }

    async fn generate_openai(&self, api_key: &str, prompt: &str) -> Result<String, GenerateError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body);
        let json = self.post(request).await?;
        extract_openai_text(&json)
    }
}

#[async_trait]
impl TextGenerator for ModelClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerateError::MissingCredential(self.provider.name()))?;

        info!("Generating via {} model {} (key {})", self.provider.name(), self.model, mask_key(api_key));
        debug!("Prompt length: {} chars", prompt.chars().count());

        let text = match self.provider {
            Provider::Gemini => self.generate_gemini(api_key, prompt).await?,
            Provider::Anthropic => self.generate_anthropic(api_key, prompt).await?,
            Provider::OpenAi => self.generate_openai(api_key, prompt).await?,
        };
        Ok(text.trim().to_string())
    }
}

fn extract_gemini_text(json: &serde_json::Value) -> Result<String, GenerateError> {
    if let Some(parts) = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
    {
        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text")?.as_str())
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }
    Err(GenerateError::Malformed("Gemini"))
}

fn extract_anthropic_text(json: &serde_json::Value) -> Result<String, GenerateError> {
    if let Some(content) = json.get("content").and_then(|c| c.as_array()) {
        let text: String = content
            .iter()
            .filter_map(|block| {
                if block.get("type")?.as_str()? == "text" {
                    block.get("text")?.as_str().map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }
    Err(GenerateError::Malformed("Anthropic"))
}

fn extract_openai_text(json: &serde_json::Value) -> Result<String, GenerateError> {
    if let Some(text) = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
    {
        return Ok(text.to_string());
    }
    Err(GenerateError::Malformed("OpenAI"))
}
