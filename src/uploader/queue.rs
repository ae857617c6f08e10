//! Appending files to the queue and starting the driver.

use crate::types::{Event, FilePayload};

use super::{UploadQueue, lock_state};

impl UploadQueue {
    /// Add one file to the end of the queue
    ///
    /// See [`add_files`](Self::add_files).
    pub fn add_file(&self, file: FilePayload) {
        self.add_files([file]);
    }

    /// Add files to the end of the queue and make sure they will be uploaded
    ///
    /// Never fails and never interrupts an upload in flight: the new records
    /// are simply appended and picked up once every earlier record has
    /// settled. If the queue was cancelled, a fresh session is started first,
    /// so adding files always resumes processing.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use upload_queue::*;
    /// # fn example(queue: UploadQueue) {
    /// queue.add_files([
    ///     FilePayload::new("a.txt", "first"),
    ///     FilePayload::new("b.txt", "second"),
    /// ]);
    /// # }
    /// ```
    pub fn add_files(&self, files: impl IntoIterator<Item = FilePayload>) {
        let mut state = lock_state(&self.state);

        if let Some(next) = state.session.renewed() {
            tracing::info!(
                previous = %state.session.id(),
                session_id = %next.id(),
                "starting new upload session after cancellation"
            );
            state.session = next;
        }

        let before = state.store.len();
        let queued: Vec<_> = state.store.append(files)[before..]
            .iter()
            .map(|record| (record.id, record.name().to_string()))
            .collect();

        let session = state.session.clone();
        let has_pending = state.store.find_first_pending().is_some();
        let start_driver = has_pending && state.driver != Some(session.id());
        if start_driver {
            // Claimed under the lock so a concurrent add cannot start a second driver
            state.driver = Some(session.id());
            self.idle_tx.send_replace(false);
        }
        drop(state);

        for (id, name) in queued {
            tracing::info!(record_id = %id, file_name = %name, "file queued for upload");
            self.emit(Event::Queued { id, name });
        }

        if start_driver {
            tracing::debug!(session_id = %session.id(), "spawning upload driver");
            let queue = self.clone();
            self.runtime.spawn(async move {
                queue.run_driver(session).await;
            });
        }
    }
}
