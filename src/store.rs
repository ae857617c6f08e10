//! Ordered record storage plus the derived active-record and progress state.

use crate::types::{FilePayload, QueueSnapshot, RecordId, UploadOutcome, UploadRecord, UploadStatus};

/// The ordered collection of upload records
///
/// Insertion order is upload order. At most one record is active at a time;
/// the store only tracks which one by id, it does not enforce sequencing
/// itself (the driver loop does).
#[derive(Debug, Default)]
pub struct QueueStore {
    records: Vec<UploadRecord>,
    active: Option<RecordId>,
    progress: f64,
    next_id: u64,
}

impl QueueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap each payload in a pending record and append it, returning the full sequence
    ///
    /// Duplicates are allowed: the same content queued twice yields two
    /// independent records with distinct ids.
    pub fn append(&mut self, files: impl IntoIterator<Item = FilePayload>) -> &[UploadRecord] {
        for payload in files {
            let id = RecordId(self.next_id);
            self.next_id += 1;
            self.records.push(UploadRecord::pending(id, payload));
        }
        &self.records
    }

    /// First record (in order) that is still pending, with its index
    pub fn find_first_pending(&self) -> Option<(usize, &UploadRecord)> {
        self.records
            .iter()
            .enumerate()
            .find(|(_, record)| !record.is_completed())
    }

    /// Replace the record at `index` with a completed copy carrying `outcome`
    ///
    /// The record is located by position and confirmed by id; if the index no
    /// longer holds `id` the store falls back to an id lookup. Returns `None`
    /// when the record is gone (the queue was reset) or was already completed.
    pub fn mark_completed(
        &mut self,
        index: usize,
        id: RecordId,
        outcome: UploadOutcome,
        destination: String,
    ) -> Option<&UploadRecord> {
        let position = match self.records.get(index) {
            Some(record) if record.id == id => index,
            _ => self.records.iter().position(|record| record.id == id)?,
        };

        let current = &self.records[position];
        if current.is_completed() {
            return None;
        }

        let completed = UploadRecord {
            destination,
            status: UploadStatus::Completed(outcome),
            ..current.clone()
        };
        self.records[position] = completed;
        Some(&self.records[position])
    }

    /// Clear all records, the active record and progress
    pub fn reset(&mut self) -> usize {
        let dropped = self.records.len();
        self.records.clear();
        self.active = None;
        self.progress = 0.0;
        dropped
    }

    /// Mark `id` as the record in flight (or none), resetting progress
    pub fn set_active(&mut self, id: Option<RecordId>) {
        self.active = id;
        self.progress = 0.0;
    }

    /// Update the active record's progress; returns the stored fraction
    pub fn set_progress(&mut self, bytes_sent: u64, bytes_total: u64) -> f64 {
        self.progress = fraction(bytes_sent, bytes_total);
        self.progress
    }

    /// Id of the record in flight
    pub fn active_id(&self) -> Option<RecordId> {
        self.active
    }

    /// The record in flight
    pub fn active(&self) -> Option<&UploadRecord> {
        let id = self.active?;
        self.records.iter().find(|record| record.id == id)
    }

    /// Progress of the active record, in [0, 1]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// All records in upload order
    pub fn records(&self) -> &[UploadRecord] {
        &self.records
    }

    /// Look up a record by id
    pub fn get(&self, id: RecordId) -> Option<&UploadRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Owned point-in-time copy for observers and hooks
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            records: self.records.clone(),
            active: self.active().cloned(),
            progress: self.progress,
        }
    }
}

/// sent/total clamped to [0, 1]; a zero total counts as no progress
fn fraction(bytes_sent: u64, bytes_total: u64) -> f64 {
    if bytes_total == 0 {
        return 0.0;
    }
    (bytes_sent as f64 / bytes_total as f64).clamp(0.0, 1.0)
}
