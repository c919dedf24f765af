use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::embedding::{EmbeddingError, VectorIndexError};

/// Main error type for foodcheck
#[derive(Error, Debug)]
pub enum FoodcheckError {
    /// Guideline corpus could not be read. Needs operator intervention.
    #[error("Corpus unavailable at {path}: {reason}")]
    CorpusUnavailable { path: PathBuf, reason: String },

    /// Two corpus files map to the same chunk id
    #[error("Duplicate chunk id '{id}' ({first} and {second})")]
    DuplicateChunkId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Embedding service failed; retryable
    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    /// Vector index build or search failed
    #[error("Vector index error: {0}")]
    VectorIndex(#[from] VectorIndexError),

    /// Completion service reported resource exhaustion
    #[error("Completion quota exceeded, retry after {}s", .retry_after.as_secs())]
    CompletionQuotaExceeded { retry_after: Duration },

    /// Any other completion service failure
    #[error("Completion service error: {0}")]
    CompletionService(String),

    /// Model output is not a JSON object
    #[error("Model returned malformed output: {reason}")]
    MalformedOutput { raw: String, reason: String },

    /// Model output parsed but broke the output contract
    #[error("Model output violates schema at '{field}': {message}")]
    SchemaViolation {
        field: String,
        message: String,
        raw: String,
    },

    /// Food log was empty or whitespace only
    #[error("Food log is empty")]
    EmptyFoodLog,

    /// Caller passed an argument outside its contract
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FoodcheckError {
    /// Whether the caller may retry the same request later without changing anything
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingService(_) | Self::CompletionQuotaExceeded { .. }
        )
    }

    /// Cool-down the caller should wait before retrying, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::CompletionQuotaExceeded { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Raw model text kept for diagnostics on output failures
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::MalformedOutput { raw, .. } | Self::SchemaViolation { raw, .. } => {
                Some(raw.as_str())
            }
            _ => None,
        }
    }

    /// Follow-up lines for a person reading the error: the retry hint for
    /// quota errors, or the model's reply when it failed validation
    pub fn diagnostics(&self) -> Option<String> {
        if let Some(retry_after) = self.retry_after() {
            return Some(format!(
                "The analysis service is busy. Try again in {} seconds.",
                retry_after.as_secs()
            ));
        }
        self.raw_output()
            .map(|raw| format!("Model reply:\n{}", raw.trim_end()))
    }
}

impl From<EmbeddingError> for FoodcheckError {
    fn from(err: EmbeddingError) -> Self {
        Self::EmbeddingService(err.to_string())
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for foodcheck operations
pub type Result<T> = std::result::Result<T, FoodcheckError>;
