//! crm-insight - natural-language analytics over a CRM database.
//!
//! Questions are classified by intent, then either translated to SQL and run
//! against MySQL, or answered by the heuristic analytics engine. The library
//! exposes every stage for the binary, the HTTP server and integration tests.

pub mod analytics;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod llm;
pub mod logging;
pub mod query;
pub mod server;
pub mod service;
