//! Error types for the harness.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors that can occur while ingesting or evaluating.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization of input or output files.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The indexer rejected an insert.
    #[error("Indexer error: {0}")]
    Indexer(String),

    /// A judge verdict lacks a rubric key or has an unusable entry.
    #[error("Malformed verdict: {0}")]
    MalformedVerdict(String),

    /// No verdict survived filtering, so win-rates are undefined.
    #[error("No well-formed verdicts to score ({discarded} discarded)")]
    InsufficientVerdicts { discarded: usize },

    /// The question file yielded nothing usable.
    #[error("No questions found in '{0}'")]
    QuestionFile(PathBuf),
}

impl HarnessError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for HarnessError {
    fn from(err: reqwest::Error) -> Self {
        HarnessError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        HarnessError::LlmParse(err.to_string())
    }
}
