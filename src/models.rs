use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Anthropic,
    #[value(name = "openai")]
    OpenAI,
}

impl Provider {
    /// Vendor name as shown in remote-call errors.
    pub fn label(&self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic",
            Provider::OpenAI => "OpenAI",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => f.write_str("anthropic"),
            Provider::OpenAI => f.write_str("openai"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Confident,
    Friendly,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tone::Professional => f.write_str("professional"),
            Tone::Confident => f.write_str("confident"),
            Tone::Friendly => f.write_str("friendly"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LetterLength {
    Short,
    #[default]
    Standard,
    Detailed,
}

impl fmt::Display for LetterLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LetterLength::Short => f.write_str("short"),
            LetterLength::Standard => f.write_str("standard"),
            LetterLength::Detailed => f.write_str("detailed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Paste,
    Pdf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub provider: Provider,
    pub model: String,
    pub tone: Tone,
    pub length: LetterLength,
    pub job_text: String,
    pub resume_text: String,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswerRequest {
    pub provider: Provider,
    pub model: String,
    pub tone: Tone,
    pub job_text: String,
    pub resume_text: String,
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanizeTextRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub letter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswerResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanizeTextResponse {
    pub text: String,
}

/// Reply to a `GET_JOB_TEXT` probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedJob {
    #[serde(default)]
    pub job_text: String,
    #[serde(default)]
    pub page_title: String,
    #[serde(default)]
    pub url: String,
}

/// One string per provider, mirroring the per-provider maps in the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderMap {
    pub anthropic: String,
    pub openai: String,
}

impl ProviderMap {
    pub fn get(&self, provider: Provider) -> &str {
        match provider {
            Provider::Anthropic => &self.anthropic,
            Provider::OpenAI => &self.openai,
        }
    }

    pub fn set(&mut self, provider: Provider, value: String) {
        match provider {
            Provider::Anthropic => self.anthropic = value,
            Provider::OpenAI => self.openai = value,
        }
    }

    fn default_models() -> Self {
        Self {
            anthropic: DEFAULT_ANTHROPIC_MODEL.to_string(),
            openai: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub provider: Provider,
    pub tone: Tone,
    pub length: LetterLength,
    pub full_name: String,
    pub session_only_resume: bool,
    #[serde(deserialize_with = "models_with_defaults")]
    pub models: ProviderMap,
    pub api_keys: ProviderMap,
}

/// A `models` map with blank or missing entries filled from the built-in defaults.
fn models_with_defaults<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<ProviderMap, D::Error> {
    let mut models = ProviderMap::deserialize(deserializer)?;
    let defaults = ProviderMap::default_models();
    for provider in [Provider::Anthropic, Provider::OpenAI] {
        if models.get(provider).trim().is_empty() {
            models.set(provider, defaults.get(provider).to_string());
        }
    }
    Ok(models)
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            tone: Tone::default(),
            length: LetterLength::default(),
            full_name: String::new(),
            session_only_resume: false,
            models: ProviderMap::default_models(),
            api_keys: ProviderMap::default(),
        }
    }
}

impl AppSettings {
    /// Stored model id for a provider, or the built-in default when blank.
    pub fn model_for(&self, provider: Provider) -> String {
        let stored = self.models.get(provider).trim();
        if stored.is_empty() {
            ProviderMap::default_models().get(provider).to_string()
        } else {
            stored.to_string()
        }
    }

    /// Stored API key for a provider, falling back to the provider's environment variable.
    /// `env` looks up an environment variable by name.
    pub fn api_key_for(&self, provider: Provider, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        let stored = self.api_keys.get(provider).trim();
        if !stored.is_empty() {
            return Some(stored.to_string());
        }
        env(provider.api_key_env())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPair {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Result envelope handed back to the calling layer.
#[derive(Debug, Clone, Serialize)]
pub struct Reply<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Reply<T> {
    pub fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { ok: false, data: None, error: Some(error.into()) }
    }
}
