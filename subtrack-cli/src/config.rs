//! CLI configuration: ~/.subtrack/config.toml plus environment overrides
//! for credentials.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use subtrack_classify::ProviderSettings;
use subtrack_classify::llm::{
    DEFAULT_GROQ_MODEL, DEFAULT_OLLAMA_MODEL, DEFAULT_OPENAI_MODEL, DEFAULT_TEMPERATURE,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmSection,
    pub email: EmailSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    /// Use the model-assisted classifier when a provider is configured.
    pub use_ai: bool,
    pub groq_model: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub openai_model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSection {
    pub host: String,
    pub port: u16,
    pub user: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmSection {
                use_ai: false,
                groq_model: DEFAULT_GROQ_MODEL.to_string(),
                ollama_base_url: "http://localhost:11434/v1".to_string(),
                ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
                openai_model: DEFAULT_OPENAI_MODEL.to_string(),
                temperature: DEFAULT_TEMPERATURE,
            },
            email: EmailSection {
                host: "imap.gmail.com".to_string(),
                port: 993,
                user: String::new(),
            },
        }
    }
}

pub fn subtrack_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".subtrack"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(subtrack_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn init_config() -> Result<()> {
    let dir = subtrack_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let s = toml::to_string_pretty(&Config::default()).context("serialize config")?;
    fs::write(&p, &s).with_context(|| format!("write {}", p.display()))?;
    println!("Wrote {}", p.display());
    Ok(())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Provider settings for the classifier. Credentials come from the
/// environment only (GROQ_API_KEY, OPENAI_API_KEY; OLLAMA_BASE_URL overrides
/// the file); model names and temperature come from the config file.
pub fn provider_settings(cfg: &Config) -> ProviderSettings {
    ProviderSettings {
        groq_api_key: non_empty_env("GROQ_API_KEY"),
        groq_model: cfg.llm.groq_model.clone(),
        ollama_base_url: non_empty_env("OLLAMA_BASE_URL")
            .or_else(|| Some(cfg.llm.ollama_base_url.clone()).filter(|u| !u.is_empty())),
        ollama_model: cfg.llm.ollama_model.clone(),
        openai_api_key: non_empty_env("OPENAI_API_KEY"),
        openai_model: cfg.llm.openai_model.clone(),
        temperature: cfg.llm.temperature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrips_through_toml() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.llm.groq_model, DEFAULT_GROQ_MODEL);
        assert_eq!(back.email.port, 993);
        assert!(!back.llm.use_ai);
    }

    #[test]
    fn test_provider_settings_carry_models() {
        let cfg = Config::default();
        let settings = provider_settings(&cfg);
        assert_eq!(settings.ollama_model, DEFAULT_OLLAMA_MODEL);
        assert_eq!(settings.temperature, DEFAULT_TEMPERATURE);
    }
}
