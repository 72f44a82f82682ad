//! Error types for schema comparison and generation.

use thiserror::Error;

/// Main error type for sync and generation operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database query error reaching the metadata layer
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Metadata acquisition failed (catalog query or file read)
    #[error("Metadata acquisition failed for {source_name}: {message}")]
    Acquisition {
        source_name: String,
        message: String,
    },

    /// Schema-level validation failed (schema absent, zero tables, bad identifier)
    #[error("Validation failed for schema '{schema}': {message}\n  Hint: {suggestion}")]
    Validation {
        schema: String,
        message: String,
        suggestion: String,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        SyncError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create an Acquisition error tagged with the metadata source name
    pub fn acquisition(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Acquisition {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a Validation error with a human-actionable suggestion
    pub fn validation(
        schema: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        SyncError::Validation {
            schema: schema.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Map the error kind to a process exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_) => 2,
            SyncError::Validation { .. } => 3,
            SyncError::Database(_) | SyncError::Pool { .. } | SyncError::Acquisition { .. } => 4,
            SyncError::Io(_) => 5,
            SyncError::Yaml(_) | SyncError::Json(_) => 2,
        }
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_error_carries_context() {
        let err = SyncError::pool("timeout", "creating source pool");
        let msg = err.to_string();
        assert!(msg.contains("timeout"));
        assert!(msg.contains("creating source pool"));
    }

    #[test]
    fn test_validation_error_includes_suggestion() {
        let err = SyncError::validation(
            "public",
            "schema not found",
            "check the schema name or create it first",
        );
        let msg = err.to_string();
        assert!(msg.contains("public"));
        assert!(msg.contains("Hint:"));
    }

    #[test]
    fn test_exit_codes_distinct_per_kind() {
        assert_eq!(SyncError::Config("x".into()).exit_code(), 2);
        assert_eq!(
            SyncError::validation("s", "m", "h").exit_code(),
            3
        );
        assert_eq!(SyncError::acquisition("source", "boom").exit_code(), 4);
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let err = SyncError::Io(io);
        let detail = err.format_detailed();
        assert!(detail.starts_with("Error:"));
        assert!(detail.contains("missing file"));
    }
}
