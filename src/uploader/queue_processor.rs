//! Queue processor. Uploads pending records strictly one at a time.
//!
//! One driver task runs per session. Each iteration claims the first pending
//! record, sends it, and writes the outcome back before looking for the next
//! one, so a new upload only ever starts after the previous one settled.
//! Every step that follows an await re-checks the session under the lock: a
//! cancelled or superseded session never mutates the store.

use std::sync::Arc;

use chrono::Utc;

use crate::session::UploadSession;
use crate::transport::{ProgressReporter, TransportError, TransportResponse, UploadRequest};
use crate::types::{Event, RecordId, UploadOutcome, UploadRecord};

use super::{QueueState, UploadQueue, lock_state};

/// A record claimed by the driver, with its request ready to send
struct ClaimedUpload {
    index: usize,
    id: RecordId,
    request: UploadRequest,
}

/// Result of looking for the next record to upload
enum Claim {
    /// Upload this record next
    Upload(ClaimedUpload),
    /// Nothing to upload right now, but the driver is still held
    Idle,
    /// The driver was released and must exit
    Stopped,
}

/// A completed record whose `file_uploaded` hook has not run yet
struct Uploaded {
    record: UploadRecord,
    records: Vec<UploadRecord>,
}

/// How a transport call ended, from the queue's point of view
enum Settlement {
    /// Record the outcome and move on
    Finished(UploadOutcome),
    /// Session was cancelled; drop the result
    Discarded,
}

/// Releases the driver claim if the driver task unwinds (e.g. a hook panicked)
struct DriverGuard<'a> {
    queue: &'a UploadQueue,
    session: &'a UploadSession,
    armed: bool,
}

impl DriverGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for DriverGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!(session_id = %self.session.id(), "upload driver stopped unexpectedly");
        let mut state = lock_state(&self.queue.state);
        if state.driver == Some(self.session.id()) {
            state.store.set_active(None);
            self.queue.release_driver(&mut state, self.session);
        }
    }
}

fn is_current(state: &QueueState, session: &UploadSession) -> bool {
    state.session.id() == session.id() && !session.is_cancelled()
}

impl UploadQueue {
    /// Drive the queue for `session` until it drains or is cancelled
    ///
    /// After a record settles, the next one is claimed (and its request
    /// built) before the completed record's `file_uploaded` hook runs; the
    /// next request is only sent once that hook returned.
    pub(crate) async fn run_driver(self, session: UploadSession) {
        let guard = DriverGuard {
            queue: &self,
            session: &session,
            armed: true,
        };
        let mut uploaded: Option<Uploaded> = None;

        loop {
            // Hold on to the driver while a hook is still owed
            let claim = self.claim_next(&session, uploaded.is_none());

            if let Some(Uploaded { record, records }) = uploaded.take() {
                self.hooks.notify_uploaded(&record, &records);
            }

            let ClaimedUpload { index, id, request } = match claim {
                Claim::Upload(claimed) => claimed,
                Claim::Idle => continue,
                Claim::Stopped => break,
            };
            let destination = request.url.clone();

            match self.transmit(&session, request).await {
                Settlement::Finished(outcome) => {
                    uploaded = self.on_file_uploaded(&session, index, id, outcome, destination);
                }
                Settlement::Discarded => {
                    tracing::debug!(
                        record_id = %id,
                        session_id = %session.id(),
                        "discarding settlement of cancelled upload"
                    );
                }
            }
        }

        guard.disarm();
        tracing::debug!(session_id = %session.id(), "upload driver stopped");
    }

    /// Claim the first pending record
    ///
    /// With nothing to upload, the driver is released only when `release` is
    /// set; otherwise the active record is cleared and [`Claim::Idle`] is
    /// returned. Releasing happens under the same lock as the emptiness check,
    /// so files added concurrently either get seen here or start a new driver.
    fn claim_next(&self, session: &UploadSession, release: bool) -> Claim {
        let mut state = lock_state(&self.state);

        if !is_current(&state, session) {
            if !release {
                return Claim::Idle;
            }
            self.release_driver(&mut state, session);
            return Claim::Stopped;
        }

        let pending = state
            .store
            .find_first_pending()
            .map(|(index, record)| (index, record.clone()));
        let Some((index, record)) = pending else {
            state.store.set_active(None);
            if !release {
                return Claim::Idle;
            }
            self.release_driver(&mut state, session);
            drop(state);

            tracing::info!(session_id = %session.id(), "upload queue drained");
            self.emit(Event::Drained);
            return Claim::Stopped;
        };

        state.store.set_active(Some(record.id));
        let records = state.store.records().to_vec();
        drop(state);

        tracing::info!(
            record_id = %record.id,
            file_name = %record.name(),
            size_bytes = record.payload.len(),
            "starting upload"
        );
        self.emit(Event::Started {
            id: record.id,
            name: record.name().to_string(),
        });

        let overrides = self.hooks.overrides_for(&record, &records);
        let request = self.template.build(&record, overrides);

        Claim::Upload(ClaimedUpload {
            index,
            id: record.id,
            request,
        })
    }

    fn release_driver(&self, state: &mut QueueState, session: &UploadSession) {
        if state.driver == Some(session.id()) {
            state.driver = None;
            self.idle_tx.send_replace(true);
        }
    }

    /// Send one request; the only suspension point of the loop
    async fn transmit(&self, session: &UploadSession, request: UploadRequest) -> Settlement {
        let id = request.record_id;
        let cancel = session.token();
        let progress = self.progress_reporter(session, id);

        // A transport that ignores the token must not hold a cancelled driver hostage
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.transport.send(request, progress, cancel.clone()) => result,
        };

        match result {
            Err(TransportError::Cancelled) if session.is_cancelled() => Settlement::Discarded,
            Err(TransportError::Cancelled) => {
                // Cancelled without our token firing: record it, or the loop would resend forever
                tracing::warn!(
                    record_id = %id,
                    "transport reported cancellation the queue did not request"
                );
                Settlement::Finished(failure_outcome(
                    TransportError::Cancelled.to_string(),
                    None,
                ))
            }
            Err(TransportError::Failed { message, response }) => {
                tracing::warn!(
                    record_id = %id,
                    error = %message,
                    status = ?response.as_ref().map(|r| r.status),
                    "upload failed"
                );
                Settlement::Finished(failure_outcome(message, response))
            }
            Ok(response) => Settlement::Finished(UploadOutcome {
                status: Some(response.status),
                status_text: Some(response.status_text),
                error: None,
                completed_at: Utc::now(),
            }),
        }
    }

    /// Mark the record completed and publish it
    ///
    /// Returns the record and updated list for the `file_uploaded` hook,
    /// which the driver calls once the next record has been claimed.
    fn on_file_uploaded(
        &self,
        session: &UploadSession,
        index: usize,
        id: RecordId,
        outcome: UploadOutcome,
        destination: String,
    ) -> Option<Uploaded> {
        let mut state = lock_state(&self.state);

        // Cancellation may have landed between settle and here
        if !is_current(&state, session) {
            tracing::debug!(record_id = %id, "settled after cancellation, ignoring");
            return None;
        }

        let Some(record) = state
            .store
            .mark_completed(index, id, outcome, destination)
            .cloned()
        else {
            tracing::debug!(record_id = %id, "record no longer pending, ignoring settlement");
            return None;
        };
        let records = state.store.records().to_vec();
        drop(state);

        let outcome = record.outcome();
        let status = outcome.and_then(|o| o.status);
        let error = outcome.and_then(|o| o.error.clone());
        tracing::info!(
            record_id = %id,
            file_name = %record.name(),
            status = ?status,
            success = outcome.is_some_and(|o| o.is_success()),
            "upload settled"
        );
        self.emit(Event::Completed { id, status, error });

        Some(Uploaded { record, records })
    }

    /// Reporter that feeds progress for `id` into the store, events and hook
    fn progress_reporter(&self, session: &UploadSession, id: RecordId) -> ProgressReporter {
        let state = Arc::clone(&self.state);
        let hooks = Arc::clone(&self.hooks);
        let event_tx = self.event_tx.clone();
        let session = session.clone();

        ProgressReporter::new(move |bytes_sent, bytes_total| {
            let (fraction, record, records) = {
                let mut state = lock_state(&state);
                let still_active = is_current(&state, &session)
                    && state.store.active_id() == Some(id)
                    && state.store.get(id).is_some_and(|r| !r.is_completed());
                if !still_active {
                    return;
                }

                let fraction = state.store.set_progress(bytes_sent, bytes_total);
                let record = state.store.get(id).cloned();
                let records = if hooks.wants_progress() {
                    state.store.records().to_vec()
                } else {
                    Vec::new()
                };
                (fraction, record, records)
            };

            tracing::debug!(record_id = %id, bytes_sent, bytes_total, fraction, "upload progress");
            event_tx
                .send(Event::Progress {
                    id,
                    fraction,
                    bytes_sent,
                    bytes_total,
                })
                .ok();

            if let Some(record) = record {
                hooks.notify_progress(&record, &records, fraction);
            }
        })
    }
}

fn failure_outcome(message: String, response: Option<TransportResponse>) -> UploadOutcome {
    UploadOutcome {
        status: response.as_ref().map(|r| r.status),
        status_text: response.map(|r| r.status_text),
        error: Some(message),
        completed_at: Utc::now(),
    }
}
