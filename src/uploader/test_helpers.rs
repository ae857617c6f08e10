//! Shared test helpers: a scripted in-memory transport and queue constructors.

use crate::config::Config;
use crate::hooks::UploadHooks;
use crate::transport::{
    ProgressReporter, Transport, TransportError, TransportResponse, UploadRequest,
};
use crate::uploader::UploadQueue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;

/// Upper bound for any wait in tests, so a broken queue fails instead of hanging
pub(crate) const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// How a scripted call settles
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    Ok(u16),
    Fail(&'static str),
    FailWithResponse(u16, &'static str),
    Cancelled,
}

/// Script for every call uploading a given file name
#[derive(Clone, Debug)]
pub(crate) struct Script {
    /// Progress reports `(sent, total)`; `None` means a single `(len, len)` report
    pub(crate) progress: Option<Vec<(u64, u64)>>,
    /// Progress reports sent after the `before_settle` callback ran
    pub(crate) late_progress: Vec<(u64, u64)>,
    pub(crate) reply: Reply,
    /// Hold the call open until [`MockTransport::release`] is called
    pub(crate) gated: bool,
    /// Keep waiting on the gate even after the token fires
    pub(crate) ignore_cancel: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            progress: None,
            late_progress: Vec::new(),
            reply: Reply::Ok(200),
            gated: false,
            ignore_cancel: false,
        }
    }
}

impl Script {
    pub(crate) fn reply(reply: Reply) -> Self {
        Self {
            reply,
            ..Self::default()
        }
    }

    pub(crate) fn gated() -> Self {
        Self {
            gated: true,
            ..Self::default()
        }
    }

    pub(crate) fn progress(steps: Vec<(u64, u64)>) -> Self {
        Self {
            progress: Some(steps),
            ..Self::default()
        }
    }
}

/// Ordered log shared between the transport and test hooks
#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(crate) fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

type SettleCallback = Box<dyn FnOnce() + Send>;

/// In-memory [`Transport`] driven by per-file scripts
pub(crate) struct MockTransport {
    scripts: Mutex<HashMap<String, Script>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    requests: Mutex<Vec<UploadRequest>>,
    started_tx: watch::Sender<usize>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    before_settle: Mutex<Option<SettleCallback>>,
    pub(crate) journal: Journal,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_journal(Journal::default())
    }

    pub(crate) fn with_journal(journal: Journal) -> Arc<Self> {
        let (started_tx, _rx) = watch::channel(0);
        Arc::new(Self {
            scripts: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            started_tx,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            before_settle: Mutex::new(None),
            journal,
        })
    }

    /// Script every call for `file_name`
    pub(crate) fn script(&self, file_name: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(file_name.to_string(), script);
    }

    /// Run `callback` once, right before the next call settles
    pub(crate) fn before_settle(&self, callback: impl FnOnce() + Send + 'static) {
        *self.before_settle.lock().unwrap() = Some(Box::new(callback));
    }

    /// Let a gated call for `file_name` proceed (works before or after it started)
    pub(crate) fn release(&self, file_name: &str) {
        self.gate(file_name).notify_one();
    }

    /// Wait until `count` calls have started
    pub(crate) async fn wait_for_calls(&self, count: usize) {
        let mut rx = self.started_tx.subscribe();
        tokio::time::timeout(TEST_TIMEOUT, rx.wait_for(|started| *started >= count))
            .await
            .expect("timed out waiting for transport calls")
            .expect("transport dropped");
    }

    /// File names in the order their calls started
    pub(crate) fn sent_names(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.file_name.clone())
            .collect()
    }

    pub(crate) fn requests(&self) -> Vec<UploadRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        *self.started_tx.borrow()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn gate(&self, file_name: &str) -> Arc<Notify> {
        Arc::clone(
            self.gates
                .lock()
                .unwrap()
                .entry(file_name.to_string())
                .or_default(),
        )
    }

    async fn run_script(
        &self,
        request: &UploadRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&request.file_name)
            .cloned()
            .unwrap_or_default();

        if script.gated {
            let gate = self.gate(&request.file_name);
            if script.ignore_cancel {
                gate.notified().await;
            } else {
                tokio::select! {
                    _ = gate.notified() => {}
                    _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                }
            }
        }

        let total = request.body.len() as u64;
        for (sent, of) in script.progress.unwrap_or_else(|| vec![(total, total)]) {
            progress.report(sent, of);
        }

        let callback = self.before_settle.lock().unwrap().take();
        if let Some(callback) = callback {
            callback();
        }
        for (sent, of) in script.late_progress {
            progress.report(sent, of);
        }

        match script.reply {
            Reply::Ok(status) => Ok(TransportResponse::new(status)),
            Reply::Fail(message) => Err(TransportError::failed(message)),
            Reply::FailWithResponse(status, message) => Err(TransportError::Failed {
                message: message.to_string(),
                response: Some(TransportResponse::new(status)),
            }),
            Reply::Cancelled => Err(TransportError::Cancelled),
        }
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        request: UploadRequest,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.journal.push(format!("send:{}", request.file_name));
        self.requests.lock().unwrap().push(request.clone());
        self.started_tx.send_modify(|started| *started += 1);

        let result = self.run_script(&request, &progress, &cancel).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.journal.push(format!("settle:{}", request.file_name));
        result
    }
}

/// Create a queue over `transport` with default config
pub(crate) fn create_test_queue(transport: Arc<MockTransport>, hooks: UploadHooks) -> UploadQueue {
    UploadQueue::new(Config::default(), transport, hooks).unwrap()
}

/// Wait for the queue's driver to stop, failing the test instead of hanging
pub(crate) async fn settle(queue: &UploadQueue) {
    tokio::time::timeout(TEST_TIMEOUT, queue.wait_until_idle())
        .await
        .expect("queue did not become idle");
}

/// Payload of `size` bytes named `name`
pub(crate) fn file(name: &str, size: usize) -> crate::types::FilePayload {
    crate::types::FilePayload::new(name, vec![0u8; size])
}
