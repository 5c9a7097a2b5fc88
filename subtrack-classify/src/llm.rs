//! Chat-completion client for the model-assisted classifier.
//!
//! Three OpenAI-compatible back-ends; the first configured provider wins,
//! chosen once at construction. The only operation that blocks on external
//! latency is `chat_complete`, bounded by a request timeout.

use anyhow::{Context, Result, bail};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4-turbo-preview";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Groq,
    Ollama,
    OpenAi,
}

impl Provider {
    pub fn label(self) -> &'static str {
        match self {
            Provider::Groq => "Groq AI",
            Provider::Ollama => "Ollama AI",
            Provider::OpenAi => "OpenAI GPT",
        }
    }
}

/// Resolved back-end: endpoint, model, credentials, sampling temperature.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub temperature: f32,
}

/// Provider credentials and model names as read from config + environment.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub ollama_base_url: Option<String>,
    pub ollama_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub temperature: f32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            groq_model: DEFAULT_GROQ_MODEL.to_string(),
            ollama_base_url: None,
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Pick the active provider: Groq, then Ollama, then OpenAI — first
/// configured wins. `None` when nothing is configured.
pub fn select_provider(settings: &ProviderSettings) -> Option<LlmConfig> {
    if let Some(key) = settings.groq_api_key.as_deref().filter(|k| !k.is_empty()) {
        return Some(LlmConfig {
            provider: Provider::Groq,
            model: settings.groq_model.clone(),
            base_url: GROQ_BASE_URL.to_string(),
            api_key: Some(key.to_string()),
            temperature: settings.temperature,
        });
    }
    if let Some(base) = settings.ollama_base_url.as_deref().filter(|u| !u.is_empty()) {
        return Some(LlmConfig {
            provider: Provider::Ollama,
            model: settings.ollama_model.clone(),
            base_url: base.trim_end_matches('/').to_string(),
            api_key: None,
            temperature: settings.temperature,
        });
    }
    if let Some(key) = settings.openai_api_key.as_deref().filter(|k| !k.is_empty()) {
        return Some(LlmConfig {
            provider: Provider::OpenAi,
            model: settings.openai_model.clone(),
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: Some(key.to_string()),
            temperature: settings.temperature,
        });
    }
    None
}

/// Issue one chat completion and return the raw response text.
///
/// Callers may already be inside a tokio runtime (the CLI uses
/// `#[tokio::main]`); creating a nested runtime and calling block_on would
/// panic, so use block_in_place on a running handle and a fresh runtime
/// otherwise.
pub fn chat_complete(config: &LlmConfig, system: &str, prompt: &str) -> Result<String> {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        tokio::task::block_in_place(|| handle.block_on(chat_complete_async(config, system, prompt)))
    } else {
        let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
        rt.block_on(chat_complete_async(config, system, prompt))
    }
}

async fn chat_complete_async(config: &LlmConfig, system: &str, prompt: &str) -> Result<String> {
    #[derive(Serialize)]
    struct Msg<'a> {
        role: &'static str,
        content: &'a str,
    }

    #[derive(Serialize)]
    struct Req<'a> {
        model: &'a str,
        messages: Vec<Msg<'a>>,
        temperature: f32,
    }

    #[derive(Deserialize)]
    struct Resp {
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: MsgOut,
    }

    #[derive(Deserialize)]
    struct MsgOut {
        content: Option<String>,
    }

    let body = Req {
        model: &config.model,
        messages: vec![
            Msg { role: "system", content: system },
            Msg { role: "user", content: prompt },
        ],
        temperature: config.temperature,
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = &config.api_key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
    }

    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("build http client")?;
    let url = format!("{}/chat/completions", config.base_url);
    let resp = client
        .post(&url)
        .headers(headers)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("{} request", config.provider.label()))?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("{} error: {status} {txt}", config.provider.label());
    }

    let out: Resp = resp
        .json()
        .await
        .with_context(|| format!("parse {} response", config.provider.label()))?;
    let content = out
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();

    Ok(content.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_groq_first() {
        let settings = ProviderSettings {
            groq_api_key: Some("gsk-test".to_string()),
            ollama_base_url: Some("http://localhost:11434/v1".to_string()),
            openai_api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let cfg = select_provider(&settings).unwrap();
        assert_eq!(cfg.provider, Provider::Groq);
        assert_eq!(cfg.model, DEFAULT_GROQ_MODEL);
    }

    #[test]
    fn test_ollama_before_openai() {
        let settings = ProviderSettings {
            ollama_base_url: Some("http://localhost:11434/v1/".to_string()),
            openai_api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let cfg = select_provider(&settings).unwrap();
        assert_eq!(cfg.provider, Provider::Ollama);
        // Trailing slash trimmed so the endpoint join is stable
        assert_eq!(cfg.base_url, "http://localhost:11434/v1");
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn test_nothing_configured() {
        assert!(select_provider(&ProviderSettings::default()).is_none());
        // Empty strings do not count as configured
        let settings = ProviderSettings {
            groq_api_key: Some(String::new()),
            ..Default::default()
        };
        assert!(select_provider(&settings).is_none());
    }
}
