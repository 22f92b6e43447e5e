//! Error types and handling
//!
//! This module provides the error types used throughout the Courtside engine.
//! All errors implement the `EngineErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! All hints are static strings. They never include:
//! - API keys or bearer tokens
//! - Database paths or raw SQL
//! - Stack traces or internal module names

use thiserror::Error;

/// Trait for engine error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait EngineErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to return to HTTP callers and does not contain:
    /// - Secrets (API keys, tokens)
    /// - File paths
    /// - Internal implementation details
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors typically require a configuration change or a restart.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Database**: SQLite open/query failures, read-only violations
/// - **LLM Provider**: API failures, authentication errors, timeouts
/// - **Agent**: Tool loop exhaustion, unknown tools
/// - **Pipeline**: Planning and synthesis failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, EngineErrorExt};
///
/// let error = EngineError::LLMTimeout;
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::AllProvidersExhausted;
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Write query not allowed: {0}")]
    WriteQueryNotAllowed(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("All LLM providers exhausted")]
    AllProvidersExhausted,

    #[error("LLM call timed out")]
    LLMTimeout,

    // Agent loop errors
    #[error("Max iterations exceeded")]
    MaxIterationsExceeded,

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    // Pipeline errors
    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Answer synthesis failed: {0}")]
    Synthesis(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            Self::Database(_) => "The statistics database is unavailable",
            Self::WriteQueryNotAllowed(_) => "Only read-only queries are permitted",

            Self::LLMProvider(_) => "Language model unavailable. Check your API key and network",
            Self::AllProvidersExhausted => "No language model providers available. Check configuration",
            Self::LLMTimeout => "The language model took too long to respond. Try again",

            Self::MaxIterationsExceeded => "Question too complex. Try asking something more specific",
            Self::ToolNotFound(_) => "The requested tool is not available",
            Self::ToolError(_) => "A database tool failed",

            Self::Planning(_) => "Could not work out which statistics to look up",
            Self::Synthesis(_) => "Could not compose an answer. Try rephrasing your question",

            Self::InvalidRequest(_) => "The request was malformed",

            Self::Network(_) => "Network operation failed. Check your connection",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_) | Self::AllProvidersExhausted | Self::WriteQueryNotAllowed(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::Database("no such table: Players".to_string());
        assert_eq!(err.to_string(), "Database error: no such table: Players");

        let err = EngineError::WriteQueryNotAllowed("DELETE".to_string());
        assert_eq!(err.to_string(), "Write query not allowed: DELETE");
    }

    #[test]
    fn test_hints_hide_details() {
        let err = EngineError::Database("/home/coach/ucd-basketball.db is locked".to_string());
        assert!(!err.user_hint().contains("/home/coach"));

        let err = EngineError::LLMProvider("Bearer sk-test".to_string());
        assert!(!err.user_hint().contains("sk-test"));
    }

    #[test]
    fn test_recoverability() {
        assert!(EngineError::LLMTimeout.is_recoverable());
        assert!(EngineError::MaxIterationsExceeded.is_recoverable());
        assert!(EngineError::Synthesis("boom".to_string()).is_recoverable());
        assert!(!EngineError::AllProvidersExhausted.is_recoverable());
        assert!(!EngineError::WriteQueryNotAllowed("DROP".to_string()).is_recoverable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
