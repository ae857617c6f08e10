//! The transport seam: the request the queue hands out and the contract the
//! sender must honour.
//!
//! The crate does not send bytes itself. A [`Transport`] receives a fully
//! built [`UploadRequest`], reports progress through a [`ProgressReporter`]
//! zero or more times, and settles exactly once. When the lent
//! [`CancellationToken`] fires, the call must fail with
//! [`TransportError::Cancelled`] so the queue can tell a cancellation apart
//! from a genuine failure.

use crate::types::RecordId;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A fully resolved upload request
#[derive(Clone, Debug)]
pub struct UploadRequest {
    /// Record this request uploads
    pub record_id: RecordId,
    /// Original file name
    pub file_name: String,
    /// Destination URL, sent as-is (may be empty if no hook resolved it)
    pub url: String,
    /// HTTP method
    pub method: Method,
    /// Request headers
    pub headers: HeaderMap,
    /// File content
    pub body: Bytes,
    /// Timeout hint from a hook; the queue itself never enforces it
    pub timeout: Option<Duration>,
}

/// A settled response from the remote endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    /// Status code
    pub status: u16,
    /// Status text (reason phrase)
    pub status_text: String,
}

impl TransportResponse {
    /// Response with the canonical reason phrase for `status`
    pub fn new(status: u16) -> Self {
        let status_text = StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            status_text,
        }
    }

    /// Response with an explicit status text
    pub fn with_text(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
        }
    }
}

/// Why a transport call did not produce a response
#[derive(Debug, Error)]
pub enum TransportError {
    /// The lent cancellation token fired; never surfaced to hooks
    #[error("upload cancelled")]
    Cancelled,

    /// The request failed; `response` carries whatever the server returned, if anything
    #[error("upload failed: {message}")]
    Failed {
        /// Error description
        message: String,
        /// Partial or error response, if one arrived
        response: Option<TransportResponse>,
    },
}

impl TransportError {
    /// A failure without any response (connection refused, reset, DNS, ...)
    pub fn failed(message: impl Into<String>) -> Self {
        TransportError::Failed {
            message: message.into(),
            response: None,
        }
    }

    /// Whether this error is the cancellation marker
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}

/// Callback handle through which a transport reports bytes sent
///
/// Cheap to clone. Reports after the session was cancelled are ignored.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn Fn(u64, u64) + Send + Sync>,
}

impl ProgressReporter {
    /// Reporter that forwards each `(bytes_sent, bytes_total)` pair to `sink`
    pub fn new(sink: impl Fn(u64, u64) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Report progress for the request this reporter was handed with
    pub fn report(&self, bytes_sent: u64, bytes_total: u64) {
        (self.sink)(bytes_sent, bytes_total);
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter").finish_non_exhaustive()
    }
}

/// Sends one upload request
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send `request`, reporting progress, and settle once
    ///
    /// Must return [`TransportError::Cancelled`] once `cancel` fires.
    async fn send(
        &self,
        request: UploadRequest,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<TransportResponse, TransportError>;
}
