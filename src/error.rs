//! # Worker Error Types
//!
//! Unified error handling for the worker client library and CLI.

use thiserror::Error;

/// Worker operation result type
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Error types for worker client operations
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// The coordinator rejected the worker's credentials during registration
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Identity error for {path}: {reason}")]
    IdentityError { path: String, reason: String },

    #[error("Failed to decompress global model: {0}")]
    DecompressionError(std::io::Error),

    #[error("Invalid update envelope: {0}")]
    EnvelopeError(String),

    #[error("Invalid response: {field} - {reason}")]
    InvalidResponse { field: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Status change handler failed: {0}")]
    HandlerError(#[from] anyhow::Error),
}

impl WorkerError {
    /// Create an API error from HTTP response
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create an identity error for a key file
    pub fn identity_error(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IdentityError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an envelope error
    pub fn envelope_error(message: impl Into<String>) -> Self {
        Self::EnvelopeError(message.into())
    }

    /// Create an invalid response error for protocol violations
    pub fn invalid_response(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is transient
    ///
    /// Nothing in this crate retries; the classification is only reported when
    /// the polling loop stops so operators can tell a flaky network from a
    /// misconfigured worker.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            WorkerError::HttpError(e) => e.is_timeout() || e.is_connect(),
            WorkerError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
