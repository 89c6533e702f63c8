//! Prompt construction for SQL generation.
//!
//! Builds the system prompt with the CRM rules and database schema context.

use crate::db::Schema;
use crate::llm::types::Message;

/// System prompt template for SQL generation.
const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a SQL expert. Convert natural language queries to MySQL SQL queries for a CRM database.

{schema}
Rules:
1. Only return the SQL query, no explanations
2. Use proper MySQL syntax
3. For date calculations, use DATE_SUB(CURDATE(), INTERVAL X DAY)
4. For inactive users, compare last_active with current date
5. Always include proper WHERE conditions
6. If asking for count only, use COUNT(*) AS count
7. If asking for user data, select relevant customer fields

Example queries:
- "Users who spend > 10000 AND visits < 3" -> SELECT * FROM customers WHERE total_spend > 10000 AND visits < 3
- "Users inactive for 90 days" -> SELECT * FROM customers WHERE last_active < DATE_SUB(CURDATE(), INTERVAL 90 DAY)
- "How many users spend > 5000" -> SELECT COUNT(*) AS count FROM customers WHERE total_spend > 5000"#;

/// Builds the system prompt with the database schema injected.
pub fn build_system_prompt(schema: &Schema) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{schema}", &schema.format_for_llm())
}

/// Builds the message list for one translation request.
pub fn build_messages(schema: &Schema, query: &str) -> Vec<Message> {
    vec![
        Message::system(build_system_prompt(schema)),
        Message::user(format!("Query: {query}\n\nSQL:")),
    ]
}
