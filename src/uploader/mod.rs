//! Core upload queue implementation split into focused submodules.
//!
//! The `UploadQueue` struct and its methods are organized by domain:
//! - [`queue`] - Appending files and starting the driver
//! - [`control`] - Cancellation and idle waiting
//! - [`queue_processor`] - The one-at-a-time driver loop
//! - [`request`] - Request construction from defaults and hook overrides

mod control;
mod queue;
mod queue_processor;
mod request;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::hooks::UploadHooks;
use crate::session::{SessionId, UploadSession};
use crate::store::QueueStore;
use crate::transport::Transport;
use crate::types::{Event, QueueSnapshot, UploadRecord};

pub(crate) use request::RequestTemplate;

/// Mutable queue state, guarded by a single lock
#[derive(Debug, Default)]
pub(crate) struct QueueState {
    /// Records, active record and progress
    pub(crate) store: QueueStore,
    /// Current session (replaced after a cancellation)
    pub(crate) session: UploadSession,
    /// Session whose driver task is currently running, if any
    pub(crate) driver: Option<SessionId>,
}

/// Lock the queue state, recovering the guard if a previous holder panicked
///
/// Hooks never run under this lock, so poisoning can only come from a bug in
/// the queue itself; the state is still structurally valid in that case.
pub(crate) fn lock_state(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sequential upload queue (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct UploadQueue {
    /// Queue state shared with the driver task and progress reporters
    pub(crate) state: Arc<Mutex<QueueState>>,
    /// Sender for each upload
    pub(crate) transport: Arc<dyn Transport>,
    /// Caller hooks
    pub(crate) hooks: Arc<UploadHooks>,
    /// Method and static headers resolved from config
    pub(crate) template: Arc<RequestTemplate>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// `true` while no driver task is running
    pub(crate) idle_tx: Arc<tokio::sync::watch::Sender<bool>>,
    /// Runtime the driver tasks are spawned on
    pub(crate) runtime: tokio::runtime::Handle,
}

impl UploadQueue {
    /// Create a new queue
    ///
    /// Validates the configuration and captures the current Tokio runtime,
    /// on which driver tasks will be spawned.
    pub fn new(config: Config, transport: Arc<dyn Transport>, hooks: UploadHooks) -> Result<Self> {
        config.validate()?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::NoRuntime(e.to_string()))?;

        let template = RequestTemplate::from_config(&config.request)?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(config.events.channel_capacity);
        let (idle_tx, _idle_rx) = tokio::sync::watch::channel(true);

        tracing::debug!(
            method = %template.method,
            hooks = ?hooks,
            "upload queue created"
        );

        Ok(Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            transport,
            hooks: Arc::new(hooks),
            template: Arc::new(template),
            event_tx,
            idle_tx: Arc::new(idle_tx),
            runtime,
        })
    }

    /// Subscribe to queue events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Point-in-time copy of records, active record and progress
    pub fn snapshot(&self) -> QueueSnapshot {
        lock_state(&self.state).store.snapshot()
    }

    /// All records in upload order
    pub fn records(&self) -> Vec<UploadRecord> {
        lock_state(&self.state).store.records().to_vec()
    }

    /// The record currently in flight
    pub fn active_record(&self) -> Option<UploadRecord> {
        lock_state(&self.state).store.active().cloned()
    }

    /// Progress of the active record, in [0, 1]
    pub fn progress(&self) -> f64 {
        lock_state(&self.state).store.progress()
    }

    /// Whether no driver task is running
    pub fn is_idle(&self) -> bool {
        *self.idle_tx.borrow()
    }

    pub(crate) fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}

impl std::fmt::Debug for UploadQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadQueue")
            .field("hooks", &self.hooks)
            .field("idle", &self.is_idle())
            .finish_non_exhaustive()
    }
}
