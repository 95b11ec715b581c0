//! Text-generation gateway: one prompt in, one string out.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const MODEL_ENV: &str = "REVIEWLENS_MODEL";
pub const API_BASE_ENV: &str = "REVIEWLENS_API_BASE";
pub const TIMEOUT_ENV: &str = "REVIEWLENS_TIMEOUT_SECS";

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),
    #[error("LLM call timed out")]
    Timeout,
    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("provider returned no text")]
    EmptyResponse,
    #[error("no API credential configured (set GEMINI_API_KEY)")]
    MissingCredential,
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e)
        }
    }
}

/// A single blocking round trip to a text-generation provider.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Provider settings. The API key is the only secret.
#[derive(Clone)]
pub struct GatewayConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GatewayConfig {
    /// Config with default model, endpoint and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read settings from the process environment.
    ///
    /// Fails with [`GenerationError::MissingCredential`] if the key is unset or blank.
    pub fn from_env() -> Result<Self, GenerationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `var`.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, GenerationError> {
        let api_key = var(API_KEY_ENV).unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(GenerationError::MissingCredential);
        }
        let mut config = Self::new(api_key);
        if let Some(model) = var(MODEL_ENV) {
            config.model = model;
        }
        if let Some(base) = var(API_BASE_ENV) {
            config.api_base = base;
        }
        if let Some(secs) = var(TIMEOUT_ENV).and_then(|s| s.parse::<u64>().ok()) {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

// ── Gemini wire types ──

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Concatenated text parts of the first candidate.
fn response_text(resp: GenerateResponse) -> Result<String, GenerationError> {
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

/// Gateway to Gemini's `generateContent` endpoint.
pub struct GeminiGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl GeminiGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GenerationError> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::MissingCredential);
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(GenerationError::Http)?;
        let config = GatewayConfig {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            ..config
        };
        info!(model = %config.model, timeout_secs = config.timeout.as_secs(), "configured LLM gateway");
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base, self.config.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiGateway {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = self.endpoint();
        let body = serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}]
        });

        debug!(url = %url, prompt_chars = prompt.len(), "calling LLM");
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text = response_text(parsed)?;
        debug!(chars = text.len(), "LLM responded");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn config_requires_a_key() {
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&[])),
            Err(GenerationError::MissingCredential)
        ));
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&[(API_KEY_ENV, "   ")])),
            Err(GenerationError::MissingCredential)
        ));
    }

    #[test]
    fn config_defaults_and_overrides() {
        let config = GatewayConfig::from_lookup(lookup(&[(API_KEY_ENV, "k")])).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);

        let config = GatewayConfig::from_lookup(lookup(&[
            (API_KEY_ENV, "k"),
            (MODEL_ENV, "gemini-2.5-pro"),
            (TIMEOUT_ENV, "5"),
            (API_BASE_ENV, "http://localhost:9000"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.api_base, "http://localhost:9000");
    }

    #[test]
    fn unparseable_timeout_keeps_default() {
        let config =
            GatewayConfig::from_lookup(lookup(&[(API_KEY_ENV, "k"), (TIMEOUT_ENV, "soon")])).unwrap();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    fn parse(json: &str) -> Result<String, GenerationError> {
        response_text(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let text = parse(
            r#"{"candidates": [
                {"content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(text, "{\"a\": 1}");
    }

    #[test]
    fn no_candidates_is_empty_response() {
        assert!(matches!(parse("{}"), Err(GenerationError::EmptyResponse)));
        assert!(matches!(
            parse(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn whitespace_only_is_empty_response() {
        assert!(matches!(
            parse(r#"{"candidates": [{"content": {"parts": [{"text": "  \n"}]}}]}"#),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn blank_key_is_missing_credential() {
        let result = GeminiGateway::new(GatewayConfig::new("   "));
        assert!(matches!(result, Err(GenerationError::MissingCredential)));
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let mut config = GatewayConfig::new("secret");
        config.api_base = "http://localhost:8080/v1beta/".into();
        config.model = "test-model".into();
        let gateway = GeminiGateway::new(config).unwrap();
        assert_eq!(
            gateway.endpoint(),
            "http://localhost:8080/v1beta/models/test-model:generateContent"
        );
    }

    #[test]
    fn debug_redacts_key() {
        let shown = format!("{:?}", GatewayConfig::new("super-secret"));
        assert!(!shown.contains("super-secret"));
        assert!(shown.contains(DEFAULT_MODEL));
    }

    #[tokio::test]
    async fn unreachable_provider_is_generation_error() {
        let mut config = GatewayConfig::new("secret");
        config.api_base = "http://127.0.0.1:9".into();
        config.timeout = Duration::from_secs(2);
        let gateway = GeminiGateway::new(config).unwrap();
        let result = gateway.generate("hello").await;
        assert!(matches!(
            result,
            Err(GenerationError::Http(_) | GenerationError::Timeout)
        ));
    }
}
