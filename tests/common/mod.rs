//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use upload_queue::{
    ProgressReporter, Transport, TransportError, TransportResponse, UploadRequest,
};

/// Transport that "sends" the body in fixed-size chunks, sleeping between them
///
/// Honours the cancellation token between chunks and remembers every request.
pub struct ChunkedTransport {
    pub chunk_size: usize,
    pub delay: Duration,
    pub status: u16,
    pub requests: Mutex<Vec<UploadRequest>>,
}

impl ChunkedTransport {
    pub fn new(chunk_size: usize, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            chunk_size,
            delay,
            status: 201,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for ChunkedTransport {
    async fn send(
        &self,
        request: UploadRequest,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        let total = request.body.len() as u64;
        let mut sent = 0u64;
        for chunk in request.body.chunks(self.chunk_size.max(1)) {
            tokio::select! {
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                _ = tokio::time::sleep(self.delay) => {}
            }
            sent += chunk.len() as u64;
            progress.report(sent, total);
        }

        Ok(TransportResponse::new(self.status))
    }
}
