//! # upload-queue
//!
//! Sequential upload queue for embedding in applications that send local
//! files to a remote endpoint.
//!
//! ## Design Philosophy
//!
//! upload-queue is designed to be:
//! - **Strictly sequential** - One upload in flight at a time, in FIFO order
//! - **Cancellable** - One call aborts the upload in flight and empties the queue
//! - **Transport-agnostic** - Bring your own sender via the [`Transport`] trait
//! - **Hook-driven** - Customize requests and observe progress without subclassing
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use upload_queue::{
//!     Config, FilePayload, ProgressReporter, RequestOverrides, Transport, TransportError,
//!     TransportResponse, UploadHooks, UploadQueue, UploadRequest,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! struct MyTransport;
//!
//! #[async_trait::async_trait]
//! impl Transport for MyTransport {
//!     async fn send(
//!         &self,
//!         request: UploadRequest,
//!         progress: ProgressReporter,
//!         _cancel: CancellationToken,
//!     ) -> Result<TransportResponse, TransportError> {
//!         let total = request.body.len() as u64;
//!         progress.report(total, total);
//!         Ok(TransportResponse::new(200))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hooks = UploadHooks::new().before_upload(|record, _all| {
//!         RequestOverrides::url(format!("https://upload.example.com/{}", record.name()))
//!     });
//!     let queue = UploadQueue::new(Config::default(), Arc::new(MyTransport), hooks)?;
//!
//!     // Subscribe to events
//!     let mut events = queue.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     queue.add_files([FilePayload::from_path("report.pdf").await?]);
//!     queue.wait_until_idle().await;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Caller-supplied lifecycle hooks
pub mod hooks;
/// Upload sessions and cancellation
pub mod session;
/// Ordered record storage
pub mod store;
/// Transport contract
pub mod transport;
/// Core types and events
pub mod types;
/// Upload queue orchestration (decomposed into focused submodules)
pub mod uploader;

// Re-export commonly used types
pub use config::{Config, EventConfig, RequestConfig};
pub use error::{Error, Result};
pub use hooks::{RequestOverrides, UploadHooks};
pub use session::{SessionId, UploadSession};
pub use store::QueueStore;
pub use transport::{
    ProgressReporter, Transport, TransportError, TransportResponse, UploadRequest,
};
pub use types::{
    Event, FilePayload, QueueSnapshot, RecordId, UploadOutcome, UploadRecord, UploadStatus,
};
pub use uploader::UploadQueue;
