//! Natural-language to SQL translation.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::debug;

use crate::db::Schema;
use crate::error::{CrmError, Result};
use crate::llm::{build_messages, LlmClient};

/// Turns a question into one SQL statement through the text-generation backend.
#[derive(Clone)]
pub struct QueryTranslator {
    llm: Arc<dyn LlmClient>,
}

impl QueryTranslator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Generates SQL for `query` given the schema context.
    ///
    /// Makes a single call. The only normalization applied to the output is
    /// stripping code fences and surrounding whitespace.
    pub async fn translate(&self, query: &str, schema: &Schema) -> Result<String> {
        let messages = build_messages(schema, query);
        let raw = self.llm.complete(&messages).await?;

        let sql = strip_code_fences(&raw);
        if sql.is_empty() {
            return Err(CrmError::generation("Empty response from the model"));
        }

        debug!("Generated SQL: {}", sql);
        Ok(sql)
    }
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```(?:sql|SQL|mysql)?").expect("fence pattern is valid"))
}

/// Removes markdown code-fence markers and trims the result.
pub fn strip_code_fences(raw: &str) -> String {
    fence_pattern().replace_all(raw, "").trim().to_string()
}
