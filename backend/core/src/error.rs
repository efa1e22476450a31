use std::path::PathBuf;

use thiserror::Error;

/// Failures of the conversation store. Always recoverable: the caller keeps
/// the in-memory conversation and may retry.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read history at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write history at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize history for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to remove history at {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Classified failure of a completion call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("inference failed: {0}")]
    Unknown(String),
}

impl InferenceError {
    /// Recoverable by switching to the manual-export path.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            InferenceError::QuotaExceeded(_) | InferenceError::TransientNetwork(_)
        )
    }

    pub fn is_fatal(&self) -> bool {
        !self.is_degraded()
    }

    /// Only transient failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InferenceError::TransientNetwork(_))
    }
}

/// Top-level error type for the tutor.
#[derive(Debug, Error)]
pub enum TutorError {
    #[error("unsupported language: {0:?}")]
    UnsupportedLanguage(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}
