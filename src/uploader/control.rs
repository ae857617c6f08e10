//! Queue control: cancellation and waiting for the driver to stop.

use crate::types::Event;

use super::{UploadQueue, lock_state};

impl UploadQueue {
    /// Abort the upload in flight and empty the queue
    ///
    /// Unconditional and immediate: the store is cleared, the session token is
    /// cancelled (aborting the in-flight transport call), and any settlement
    /// that arrives afterwards is discarded. Calling this on an empty queue is
    /// harmless. The next [`add_files`](Self::add_files) starts a new session.
    pub fn cancel_upload(&self) {
        let (dropped, session_id) = {
            let mut state = lock_state(&self.state);
            let dropped = state.store.reset();
            state.session.cancel();
            (dropped, state.session.id())
        };

        tracing::info!(session_id = %session_id, dropped, "upload queue cancelled");
        self.emit(Event::Cancelled { dropped });
    }

    /// Wait until no driver task is running
    ///
    /// Resolves once every pending record has settled, or once a cancelled
    /// driver has wound down. Returns immediately if the queue is idle.
    pub async fn wait_until_idle(&self) {
        let mut idle_rx = self.idle_tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        idle_rx.wait_for(|idle| *idle).await.ok();
    }
}
