//! Error types shared by the triage core and its adapters
//!
//! `TriageError` covers everything a batch step can fail with. Model output
//! problems get their own `ClassificationError` so callers can tell a bad
//! payload from a dead transport.

use thiserror::Error;

/// Application error type for core operations and adapters
#[derive(Debug, Clone, Error)]
pub enum TriageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Why a model response could not be turned into a `Classification`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    #[error("model returned an empty response")]
    Empty,

    #[error("model returned malformed JSON: {0}")]
    MalformedJson(String),

    #[error("model output does not match the classification schema: {0}")]
    Schema(String),

    #[error("classifier request failed: {0}")]
    Transport(String),
}

impl From<std::io::Error> for TriageError {
    fn from(err: std::io::Error) -> Self {
        TriageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TriageError {
    fn from(err: serde_json::Error) -> Self {
        TriageError::Parse(err.to_string())
    }
}

impl From<String> for TriageError {
    fn from(err: String) -> Self {
        TriageError::Other(err)
    }
}

impl From<&str> for TriageError {
    fn from(err: &str) -> Self {
        TriageError::Other(err.to_string())
    }
}

/// Result type alias using TriageError
pub type Result<T> = std::result::Result<T, TriageError>;
