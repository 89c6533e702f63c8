//! Mock text-generation client for testing.
//!
//! Provides deterministic SQL responses based on input patterns.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{CrmError, Result};
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Mock client that returns canned responses based on input patterns.
///
/// Used for unit testing without making real API calls. Clones share the
/// record of received prompts.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Fail every call with this message.
    failure: Option<String>,
    /// User messages received so far.
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the input contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Makes every call fail with a generation error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Returns the user prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        // Check custom responses first
        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if input_lower.contains("how many") || input_lower.contains("count") {
            return "```sql\nSELECT COUNT(*) AS count FROM customers WHERE total_spend > 0\n```"
                .to_string();
        }

        if input_lower.contains("inactive") {
            return "```sql\nSELECT * FROM customers WHERE last_active < DATE_SUB(CURDATE(), INTERVAL 90 DAY)\n```"
                .to_string();
        }

        if input_lower.contains("spend") || input_lower.contains("users") {
            return "```sql\nSELECT * FROM customers WHERE total_spend > 10000 AND visits < 3\n```"
                .to_string();
        }

        "SELECT * FROM customers WHERE 1 = 1".to_string()
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let input = Self::extract_user_input(messages);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(input.clone());
        }

        if let Some(message) = &self.failure {
            return Err(CrmError::generation(message.clone()));
        }

        Ok(self.mock_response(&input))
    }
}
