//! Error types for crm-insight.
//!
//! Defines the error enum shared by the query pipeline, the analytics engine
//! and the HTTP surface.

use thiserror::Error;

/// Main error type for crm-insight operations.
#[derive(Error, Debug)]
pub enum CrmError {
    /// The query text or the data-source configuration was not supplied.
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    /// Invalid configuration file or connection string.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The data source could not be reached (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    ConnectionFailed(String),

    /// The text-generation backend returned no usable text.
    #[error("Generation error: {0}")]
    GenerationFailed(String),

    /// The store rejected the generated statement.
    #[error("Execution error: {0}")]
    ExecutionFailed(String),

    /// Writing the spreadsheet failed.
    #[error("Export error: {0}")]
    ExportFailed(String),

    /// A requested export file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrmError {
    /// Creates a missing-configuration error with the given message.
    pub fn config_missing(msg: impl Into<String>) -> Self {
        Self::ConfigMissing(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    /// Creates a generation error with the given message.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::GenerationFailed(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Creates an export error with the given message.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::ExportFailed(msg.into())
    }

    /// Creates a not-found error with the given message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::ConfigMissing(_) => "Missing Configuration",
            Self::Config(_) => "Configuration Error",
            Self::ConnectionFailed(_) => "Connection Error",
            Self::GenerationFailed(_) => "Generation Error",
            Self::ExecutionFailed(_) => "Execution Error",
            Self::ExportFailed(_) => "Export Error",
            Self::NotFound(_) => "Not Found",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the HTTP-equivalent status code for this error.
    ///
    /// Caller errors map to 400, missing export files to 404 and every other
    /// failure to 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ConfigMissing(_) => 400,
            Self::NotFound(_) => 404,
            _ => 500,
        }
    }

    /// Returns the message shown to API callers.
    ///
    /// Internal faults are reduced to a generic message; their detail only
    /// goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            Self::ConfigMissing(msg) => msg.clone(),
            Self::ConnectionFailed(_) => "Database connection failed".to_string(),
            Self::GenerationFailed(_) => "Failed to generate SQL query".to_string(),
            Self::ExecutionFailed(_) => "Query execution failed".to_string(),
            Self::NotFound(_) => "File not found".to_string(),
            Self::Config(_) | Self::ExportFailed(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

/// Result type alias using CrmError.
pub type Result<T> = std::result::Result<T, CrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_connection() {
        let err = CrmError::connection("Cannot connect to localhost:3306");
        assert_eq!(
            err.to_string(),
            "Connection error: Cannot connect to localhost:3306"
        );
        assert_eq!(err.category(), "Connection Error");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_error_display_execution() {
        let err = CrmError::execution("Unknown column 'emal' in 'field list'");
        assert_eq!(
            err.to_string(),
            "Execution error: Unknown column 'emal' in 'field list'"
        );
        assert_eq!(err.category(), "Execution Error");
        assert_eq!(err.public_message(), "Query execution failed");
    }

    #[test]
    fn test_error_display_generation() {
        let err = CrmError::generation("empty response");
        assert_eq!(err.to_string(), "Generation error: empty response");
        assert_eq!(err.public_message(), "Failed to generate SQL query");
    }

    #[test]
    fn test_config_missing_is_caller_error() {
        let err = CrmError::config_missing("Query and database config are required");
        assert_eq!(err.status_code(), 400);
        assert_eq!(
            err.public_message(),
            "Query and database config are required"
        );
    }

    #[test]
    fn test_not_found_status() {
        let err = CrmError::not_found("exports/missing.xlsx");
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.category(), "Not Found");
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = CrmError::internal("index out of bounds at shaper.rs:42");
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CrmError>();
    }
}
