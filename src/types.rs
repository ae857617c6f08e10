//! Core types for upload-queue

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unique identifier for a queued record
///
/// Ids are assigned in append order and never reused within one
/// [`UploadQueue`](crate::UploadQueue), so two records carrying identical
/// payloads are still told apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The local file content to upload: a name plus its bytes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePayload {
    /// Original file name, sent in the `X-File-Name` header
    pub name: String,
    /// File content
    pub bytes: Bytes,
}

impl FilePayload {
    /// Create a payload from a name and anything convertible to [`Bytes`]
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file into a payload, using its file name
    pub async fn from_path(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(name, bytes))
    }

    /// Payload size in bytes
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether the payload has no content
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The settled result of one upload attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// Response status code, absent when the request never got a response
    pub status: Option<u16>,
    /// Response status text (e.g. "OK")
    pub status_text: Option<String>,
    /// Transport error message, present only when the request failed
    pub error: Option<String>,
    /// When the transport call settled
    pub completed_at: DateTime<Utc>,
}

impl UploadOutcome {
    /// Whether the request finished with a 2xx status and no transport error
    pub fn is_success(&self) -> bool {
        self.error.is_none() && matches!(self.status, Some(200..=299))
    }
}

/// Upload status of a record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadStatus {
    /// Waiting to be uploaded (or currently in flight)
    #[default]
    Pending,
    /// Transport call settled, successfully or not
    Completed(UploadOutcome),
}

/// One file's tracked upload unit
#[derive(Clone, Debug, PartialEq)]
pub struct UploadRecord {
    /// Unique record id
    pub id: RecordId,
    /// The file being uploaded
    pub payload: FilePayload,
    /// Destination URL (may be empty until a hook resolves it)
    pub destination: String,
    /// Pending or completed with an outcome
    pub status: UploadStatus,
    /// When the record was appended to the queue
    pub added_at: DateTime<Utc>,
}

impl UploadRecord {
    pub(crate) fn pending(id: RecordId, payload: FilePayload) -> Self {
        Self {
            id,
            payload,
            destination: String::new(),
            status: UploadStatus::Pending,
            added_at: Utc::now(),
        }
    }

    /// Whether the transport call for this record has settled
    pub fn is_completed(&self) -> bool {
        matches!(self.status, UploadStatus::Completed(_))
    }

    /// The settled outcome, if any
    pub fn outcome(&self) -> Option<&UploadOutcome> {
        match &self.status {
            UploadStatus::Completed(outcome) => Some(outcome),
            UploadStatus::Pending => None,
        }
    }

    /// File name of the payload
    pub fn name(&self) -> &str {
        &self.payload.name
    }
}

/// Point-in-time view of the queue
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueSnapshot {
    /// All records in upload order
    pub records: Vec<UploadRecord>,
    /// The record currently in flight
    pub active: Option<UploadRecord>,
    /// Transmitted/total ratio of the active record, in [0, 1]
    pub progress: f64,
}

impl QueueSnapshot {
    /// Number of records whose transport call has settled
    pub fn completed_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_completed()).count()
    }

    /// Number of records still waiting (including the active one)
    pub fn pending_count(&self) -> usize {
        self.records.len() - self.completed_count()
    }
}

/// Events emitted by the upload queue
///
/// Subscribe with [`UploadQueue::subscribe`](crate::UploadQueue::subscribe).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Record appended to the queue
    Queued {
        /// Record id
        id: RecordId,
        /// File name
        name: String,
    },

    /// Record became active and its request is about to be sent
    Started {
        /// Record id
        id: RecordId,
        /// File name
        name: String,
    },

    /// Progress report for the active record
    Progress {
        /// Record id
        id: RecordId,
        /// Transmitted/total ratio (0.0 to 1.0)
        fraction: f64,
        /// Bytes sent so far
        bytes_sent: u64,
        /// Total bytes to send
        bytes_total: u64,
    },

    /// Transport call settled and the record was marked completed
    Completed {
        /// Record id
        id: RecordId,
        /// Response status code, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        /// Transport error message, if the request failed
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Queue cleared by a cancellation
    Cancelled {
        /// Number of records dropped from the queue
        dropped: usize,
    },

    /// No pending record remains
    Drained,
}
