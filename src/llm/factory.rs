//! Text-generation client factory.
//!
//! Centralizes provider-specific logic for creating clients.

use crate::config::LlmConfig;
use crate::error::{CrmError, Result};
use crate::llm::gemini::DEFAULT_GEMINI_MODEL;
use crate::llm::openai::DEFAULT_OPENAI_MODEL;
use crate::llm::{
    GeminiClient, GeminiConfig, LlmClient, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig,
};

/// Creates a client for the provider named in `config`.
///
/// The API key is resolved in order:
/// 1. `config.api_key`
/// 2. Environment variable (`OPENAI_API_KEY` or `GEMINI_API_KEY`)
///
/// The model is `config.model` when set, otherwise `OPENAI_MODEL` /
/// `GEMINI_MODEL`, otherwise the provider default.
pub fn create_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    create_client_with(config, |key| std::env::var(key).ok())
}

/// Like [`create_client`], reading environment variables through `lookup`.
pub fn create_client_with(
    config: &LlmConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Box<dyn LlmClient>> {
    let provider: LlmProvider = config.provider.parse().map_err(CrmError::config)?;

    let model = |env_key: &str, default: &str| {
        if config.model.is_empty() {
            lookup(env_key).unwrap_or_else(|| default.to_string())
        } else {
            config.model.clone()
        }
    };
    let api_key = |env_key: &str| {
        config
            .api_key
            .clone()
            .or_else(|| lookup(env_key))
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                CrmError::config(format!(
                    "No API key configured. Set {env_key} or [llm].api_key."
                ))
            })
    };

    match provider {
        LlmProvider::OpenAi => {
            let key = api_key("OPENAI_API_KEY")?;
            let model = model("OPENAI_MODEL", DEFAULT_OPENAI_MODEL);
            Ok(Box::new(OpenAiClient::new(OpenAiConfig::new(key, model))?))
        }
        LlmProvider::Gemini => {
            let key = api_key("GEMINI_API_KEY")?;
            let model = model("GEMINI_MODEL", DEFAULT_GEMINI_MODEL);
            Ok(Box::new(GeminiClient::new(GeminiConfig::new(key, model))?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}
