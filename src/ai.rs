use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::Provider;

const MAX_TOKENS: u32 = 900;
const TEMPERATURE: f32 = 0.4;

// --- Provider trait ---

pub trait AIProvider {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
    fn model_name(&self) -> &str;
}

/// One case per supported backend; each carries what its call needs.
#[derive(Debug)]
pub enum ProviderClient {
    Anthropic(AnthropicProvider),
    OpenAI(OpenAIProvider),
}

impl ProviderClient {
    pub fn new(provider: Provider, api_key: String, model_id: String) -> Self {
        match provider {
            Provider::Anthropic => ProviderClient::Anthropic(AnthropicProvider::new(api_key, model_id)),
            Provider::OpenAI => ProviderClient::OpenAI(OpenAIProvider::new(api_key, model_id)),
        }
    }
}

impl AIProvider for ProviderClient {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        match self {
            ProviderClient::Anthropic(p) => p.complete(system_prompt, user_prompt),
            ProviderClient::OpenAI(p) => p.complete(system_prompt, user_prompt),
        }
    }

    fn model_name(&self) -> &str {
        match self {
            ProviderClient::Anthropic(p) => p.model_name(),
            ProviderClient::OpenAI(p) => p.model_name(),
        }
    }
}

/// Builds the client for a provider call. Swapped out in tests.
pub trait ProviderFactory {
    fn create(&self, provider: Provider, api_key: String, model_id: String) -> Box<dyn AIProvider>;
}

pub struct HttpProviderFactory;

impl ProviderFactory for HttpProviderFactory {
    fn create(&self, provider: Provider, api_key: String, model_id: String) -> Box<dyn AIProvider> {
        Box::new(ProviderClient::new(provider, api_key, model_id))
    }
}

/// Send a JSON body and hand back the raw response text, mapping non-2xx to a remote error.
fn post_json<T: Serialize>(
    request: reqwest::blocking::RequestBuilder,
    body: &T,
    service: &str,
) -> Result<String> {
    let transport = |source| AppError::Transport {
        service: service.to_string(),
        source,
    };

    let response = request
        .header("content-type", "application/json")
        .json(body)
        .send()
        .map_err(transport)?;

    let status = response.status();
    let text = response.text().map_err(transport)?;
    if !status.is_success() {
        return Err(AppError::Remote {
            service: service.to_string(),
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(text)
}

fn non_empty(text: Option<&str>, service: &str) -> Result<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::EmptyResponse(service.to_string()))
}

// --- Anthropic provider ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model_id: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model_id: String) -> Self {
        Self::with_base_url(api_key, model_id, ANTHROPIC_API_URL)
    }

    pub fn with_base_url(api_key: String, model_id: String, base_url: &str) -> Self {
        Self {
            api_key,
            model_id,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl AIProvider for AnthropicProvider {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let service = Provider::Anthropic.label();
        let request = AnthropicRequest {
            model: &self.model_id,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: system_prompt,
            messages: vec![AnthropicMessage {
                role: "user",
                content: user_prompt,
            }],
        };

        debug!(model = %self.model_id, "sending Anthropic request");
        let builder = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01");
        let raw = post_json(builder, &request, service)?;

        let api_response: AnthropicResponse =
            serde_json::from_str(&raw).map_err(|source| AppError::Decode {
                service: service.to_string(),
                source,
            })?;

        let text = api_response
            .content
            .iter()
            .find(|block| block.content_type == "text")
            .and_then(|block| block.text.as_deref());
        non_empty(text, service)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- OpenAI provider ---

const OPENAI_API_URL: &str = "https://api.openai.com";

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<OpenAIMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug)]
pub struct OpenAIProvider {
    api_key: String,
    model_id: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl OpenAIProvider {
    pub fn new(api_key: String, model_id: String) -> Self {
        Self::with_base_url(api_key, model_id, OPENAI_API_URL)
    }

    pub fn with_base_url(api_key: String, model_id: String, base_url: &str) -> Self {
        Self {
            api_key,
            model_id,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl AIProvider for OpenAIProvider {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let service = Provider::OpenAI.label();
        let request = OpenAIRequest {
            model: &self.model_id,
            temperature: TEMPERATURE,
            messages: vec![
                OpenAIMessage {
                    role: "system",
                    content: system_prompt,
                },
                OpenAIMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        debug!(model = %self.model_id, "sending OpenAI request");
        let builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key));
        let raw = post_json(builder, &request, service)?;

        let api_response: OpenAIResponse =
            serde_json::from_str(&raw).map_err(|source| AppError::Decode {
                service: service.to_string(),
                source,
            })?;

        let text = api_response
            .choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref());
        non_empty(text, service)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_provider_client_dispatches_by_kind() {
        let client = ProviderClient::new(Provider::OpenAI, "sk".into(), "gpt-4.1-mini".into());
        assert!(matches!(client, ProviderClient::OpenAI(_)));
        assert_eq!(client.model_name(), "gpt-4.1-mini");

        let client = ProviderClient::new(Provider::Anthropic, "sk".into(), "claude-3-5-haiku-latest".into());
        assert!(matches!(client, ProviderClient::Anthropic(_)));
    }

    #[test]
    fn test_anthropic_returns_first_text_block() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", "2023-06-01")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "claude-3-5-haiku-latest",
                "max_tokens": 900,
                "system": "sys",
                "messages": [{"role": "user", "content": "usr"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content":[{"type":"thinking"},{"type":"text","text":"  Dear team,\nHello  "}]}"#)
            .create();

        let provider = AnthropicProvider::with_base_url(
            "test-key".into(),
            "claude-3-5-haiku-latest".into(),
            &server.url(),
        );
        let text = provider.complete("sys", "usr").unwrap();

        mock.assert();
        assert_eq!(text, "Dear team,\nHello");
    }

    #[test]
    fn test_anthropic_error_status_includes_body() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body(r#"{"error":{"message":"invalid x-api-key"}}"#)
            .create();

        let provider = AnthropicProvider::with_base_url("bad".into(), "m".into(), &server.url());
        let err = provider.complete("sys", "usr").unwrap_err();

        match err {
            AppError::Remote { service, status, body } => {
                assert_eq!(service, "Anthropic");
                assert_eq!(status, 401);
                assert!(body.contains("invalid x-api-key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_anthropic_without_text_block_is_empty_response() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"   "}]}"#)
            .create();

        let provider = AnthropicProvider::with_base_url("k".into(), "m".into(), &server.url());
        let err = provider.complete("sys", "usr").unwrap_err();
        assert_eq!(err.to_string(), "Anthropic returned an empty response.");
    }

    #[test]
    fn test_openai_reads_first_choice() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4.1-mini",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "usr"}
                ]
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Answer text\n"}}]}"#)
            .create();

        let provider = OpenAIProvider::with_base_url("sk-test".into(), "gpt-4.1-mini".into(), &server.url());
        let text = provider.complete("sys", "usr").unwrap();

        mock.assert();
        assert_eq!(text, "Answer text");
    }

    #[test]
    fn test_openai_empty_choices() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create();

        let provider = OpenAIProvider::with_base_url("k".into(), "m".into(), &server.url());
        let err = provider.complete("sys", "usr").unwrap_err();
        assert!(matches!(err, AppError::EmptyResponse(ref s) if s == "OpenAI"));
    }

    #[test]
    fn test_openai_server_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("upstream exploded")
            .create();

        let provider = OpenAIProvider::with_base_url("k".into(), "m".into(), &server.url());
        let err = provider.complete("sys", "usr").unwrap_err();
        assert_eq!(err.to_string(), "OpenAI request failed (500): upstream exploded");
    }
}
