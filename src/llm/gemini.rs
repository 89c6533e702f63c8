//! Google Gemini client implementation.
//!
//! Implements the LlmClient trait for the `generateContent` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CrmError, Result};
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Gemini API base URL.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Model to use (e.g., "gemini-1.5-flash").
    pub model: String,
    /// API base URL, overridable for proxies.
    pub base_url: String,
}

impl GeminiConfig {
    /// Creates a new config with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    /// Creates a new Gemini client with the given configuration.
    ///
    /// No client-side timeout is set; the call is bounded by the remote side.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| CrmError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Splits messages into the system instruction and the content turns.
    fn build_request(messages: &[Message]) -> GeminiRequest {
        let system: Vec<GeminiPart> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| GeminiPart {
                text: m.content.clone(),
            })
            .collect();

        let contents = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| GeminiContent {
                role: Some(
                    match m.role {
                        Role::Assistant => "model",
                        _ => "user",
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart {
                    text: m.content.clone(),
                }],
            })
            .collect();

        GeminiRequest {
            system_instruction: (!system.is_empty()).then_some(GeminiContent {
                role: None,
                parts: system,
            }),
            contents,
        }
    }

    /// Extracts the text of the first candidate.
    fn extract_text(response: GeminiResponse) -> Option<String> {
        let candidate = response.candidates.into_iter().next()?;
        let text: String = candidate
            .content?
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// Converts an unsuccessful API response into an error.
    fn parse_error(status: reqwest::StatusCode, body: &str) -> CrmError {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return CrmError::generation("Authentication failed. Check your GEMINI_API_KEY.");
        }

        if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(body) {
            return CrmError::generation(format!(
                "Gemini API error: {}",
                error_response.error.message
            ));
        }

        CrmError::generation(format!("Gemini API error ({}): {}", status, body))
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let request = Self::build_request(messages);

        debug!("Gemini API request with model {}", self.config.model);

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    CrmError::generation("Failed to connect to Gemini API. Check your network.")
                } else {
                    CrmError::generation(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CrmError::generation(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        let response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| CrmError::generation(format!("Failed to parse response: {}", e)))?;

        Self::extract_text(response).ok_or_else(|| CrmError::generation("No response from Gemini"))
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
