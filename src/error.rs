//! Error types for upload-queue
//!
//! Only construction and file loading can fail. Queue operations
//! (`add_files`, `cancel_upload`) never return errors: transport outcomes are
//! recorded on the affected [`UploadRecord`](crate::types::UploadRecord) and
//! reported through hooks and [`Event`](crate::types::Event)s instead.

use thiserror::Error;

/// Result type alias for upload-queue operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for upload-queue
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "request.method")
        key: Option<String>,
    },

    /// A configured header name or value is not valid HTTP
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader {
        /// The offending header name
        name: String,
        /// Why the header was rejected
        reason: String,
    },

    /// I/O error (reading a local file into a payload)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The queue was constructed outside a Tokio runtime
    #[error("no Tokio runtime available: {0}")]
    NoRuntime(String),
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// The configuration key associated with this error, if any
    pub fn config_key(&self) -> Option<&str> {
        match self {
            Error::Config { key, .. } => key.as_deref(),
            _ => None,
        }
    }
}
