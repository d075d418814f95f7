//! Client for the third-party humanizer rewrite endpoint.
//!
//! The endpoint is undocumented and authenticates with a made-up session
//! cookie; it can change upstream without notice. Everything else in the
//! crate talks to it through [`Humanizer`] only.

use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{AppError, Result};

const HUMANIZE_API_URL: &str = "https://www.humanizeai.io/humanize_adv.php";
const SESSION_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SESSION_ID_LEN: usize = 26;
const SERVICE: &str = "Humanize";

pub trait Humanizer {
    fn humanize(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct HumanizeResponse {
    message: Option<String>,
    #[allow(dead_code)]
    message2: Option<String>,
    error: Option<Value>,
}

/// 26 random characters from `[a-z0-9]`.
pub fn create_session_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ALPHABET[rng.gen_range(0..SESSION_ALPHABET.len())] as char)
        .collect()
}

pub struct HumanizeAiClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HumanizeAiClient {
    pub fn new() -> Self {
        Self::with_endpoint(HUMANIZE_API_URL)
    }

    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HumanizeAiClient {
    fn default() -> Self {
        Self::new()
    }
}

fn error_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Humanizer for HumanizeAiClient {
    fn humanize(&self, text: &str) -> Result<String> {
        let transport = |source| AppError::Transport {
            service: SERVICE.to_string(),
            source,
        };
        let form = [
            ("aiText", text),
            ("captchaInput", ""),
            ("mode", "BASIC"),
            ("readability", "Standard"),
            ("freeze_keywords", ""),
        ];

        debug!(chars = text.chars().count(), "sending humanize request");
        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "Cookie",
                format!("clickCount=1; humanizeai_session={}", create_session_id()),
            )
            .form(&form)
            .send()
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().map_err(transport)?;
        if !status.is_success() {
            return Err(AppError::Remote {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let payload: HumanizeResponse =
            serde_json::from_str(&body).map_err(|source| AppError::Decode {
                service: SERVICE.to_string(),
                source,
            })?;

        if let Some(error) = payload.error.as_ref().map(error_text) {
            if error != "No" {
                return Err(AppError::Humanize(error));
            }
        }

        let first_version = payload.message.unwrap_or_default();
        let first_version = first_version.trim();
        if first_version.is_empty() {
            return Err(AppError::EmptyHumanized);
        }
        Ok(first_version.to_string())
    }
}
