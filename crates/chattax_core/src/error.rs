use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes shared across the retrieval core. Kept as constants so call
/// sites and tests never drift on spelling.
pub mod codes {
    /// Settings could not be read or were internally inconsistent.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
    /// Corpus index/metadata missing, undecodable, or built with another model.
    pub const CORPUS_CONFIG_INVALID: &str = "CORPUS_CONFIG_INVALID";
    /// Query embedding call failed or returned an unusable vector.
    pub const EMBEDDINGS_FAILED: &str = "EMBEDDINGS_FAILED";
    /// Stage-1 retrieval could not run.
    pub const RETRIEVAL_FAILED: &str = "RETRIEVAL_FAILED";
    /// Cross-encoder scoring failed (recovered internally, never surfaced).
    pub const RERANK_FAILED: &str = "RERANK_FAILED";
    /// Answer generation failed mid-stream.
    pub const GENERATION_FAILED: &str = "GENERATION_FAILED";
    /// Model server base URL pointed somewhere other than 127.0.0.1.
    pub const REMOTE_NOT_ALLOWED: &str = "REMOTE_NOT_ALLOWED";
    pub const MODEL_SERVER_UNREACHABLE: &str = "MODEL_SERVER_UNREACHABLE";
    pub const MODEL_SERVER_UNHEALTHY: &str = "MODEL_SERVER_UNHEALTHY";
}

/// Single structured error shape used across the retrieval core.
///
/// `code` is one of [`codes`], `message` is safe to show to a caller,
/// `details` carries operator-facing context (paths, statuses, raw errors).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    /// Fatal startup configuration error (spec taxonomy class 1).
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(codes::CORPUS_CONFIG_INVALID, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is_code(&self, code: &str) -> bool {
        self.code == code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
