//! Generative-text client
//!
//! The responder talks to the model through [`TextGenerator`], a single
//! prompt-in/text-out seam. [`GeminiClient`] is the production
//! implementation against the Gemini `generateContent` endpoint.

use crate::error::{PracticumError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use tracing::debug;

/// Failure reported by the generative-text service
///
/// Carries whatever the service told us so the responder can classify it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("generation failed (status {status:?}): {message}")]
pub struct GenerationError {
    /// HTTP status, when the failure came with one
    pub status: Option<u16>,
    pub message: String,
}

impl GenerationError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Single-prompt text generation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError>;
}

/// Configuration for the Gemini client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Gemini API key
    pub api_key: String,

    /// Model to use (default: gemini-2.5-flash)
    pub model: String,

    /// API root, overridable for proxies
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

/// Gemini API request format
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// Gemini API response format
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Gemini error envelope
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Client for the Gemini generative-text API
pub struct GeminiClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new client; fails when no API key is configured
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(PracticumError::Config("GEMINI_API_KEY not set".to_string()));
        }

        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    /// Create with default config
    pub fn with_default() -> Result<Self> {
        Self::new(LlmConfig::default())
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        debug!("Calling Gemini API ({})", self.config.model);

        let request = GenerateRequest {
            contents: vec![RequestContent {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::new(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorEnvelope>(&error_text) {
                Ok(envelope) => format!(
                    "[{} {}] {}",
                    status.as_u16(),
                    envelope.error.status,
                    envelope.error.message
                ),
                Err(_) => format!("[{}] {}", status.as_u16(), error_text),
            };
            return Err(GenerationError::new(Some(status.as_u16()), message));
        }

        let api_response: GenerateResponse = response.json().await.map_err(|e| {
            GenerationError::new(None, format!("Failed to parse response: {}", e))
        })?;

        let text: String = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerationError::new(None, "Empty response from API"));
        }
        Ok(text)
    }
}
