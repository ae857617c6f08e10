//! Caller-supplied lifecycle hooks.
//!
//! All three hooks are optional and synchronous. They run on the queue's
//! driver task, never while the queue lock is held, and always receive an
//! owned snapshot of the full record list alongside the record concerned.
//! A hook that blocks stalls the queue.

use crate::types::UploadRecord;
use reqwest::Method;
use reqwest::header::HeaderMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Request settings a `before_upload` hook may override
///
/// `url`, `method` and `timeout` replace the defaults when set. `headers` are
/// inserted one by one over the default headers, so a hook can both add new
/// headers and replace built-in ones without restating the rest.
#[derive(Clone, Debug, Default)]
pub struct RequestOverrides {
    /// Destination URL
    pub url: Option<String>,
    /// HTTP method
    pub method: Option<Method>,
    /// Headers merged over the defaults
    pub headers: HeaderMap,
    /// Timeout hint forwarded to the transport
    pub timeout: Option<Duration>,
}

impl RequestOverrides {
    /// Overrides that only set the destination URL
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }
}

type BeforeUploadFn = dyn Fn(&UploadRecord, &[UploadRecord]) -> RequestOverrides + Send + Sync;
type UploadProgressFn = dyn Fn(&UploadRecord, &[UploadRecord], f64) + Send + Sync;
type FileUploadedFn = dyn Fn(&UploadRecord, &[UploadRecord]) + Send + Sync;

/// The three extension points, configured once at queue construction
///
/// ```
/// use upload_queue::{RequestOverrides, UploadHooks};
///
/// let hooks = UploadHooks::new()
///     .before_upload(|record, _all| {
///         RequestOverrides::url(format!("https://upload.example.com/{}", record.name()))
///     })
///     .file_uploaded(|record, all| {
///         println!("{} done ({} queued)", record.name(), all.len());
///     });
/// # let _ = hooks;
/// ```
#[derive(Clone, Default)]
pub struct UploadHooks {
    before_upload: Option<Arc<BeforeUploadFn>>,
    upload_progress: Option<Arc<UploadProgressFn>>,
    file_uploaded: Option<Arc<FileUploadedFn>>,
}

impl UploadHooks {
    /// No hooks
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply per-file request overrides (destination, method, headers, ...)
    pub fn before_upload(
        mut self,
        hook: impl Fn(&UploadRecord, &[UploadRecord]) -> RequestOverrides + Send + Sync + 'static,
    ) -> Self {
        self.before_upload = Some(Arc::new(hook));
        self
    }

    /// Observe progress of the active record as a fraction in [0, 1]
    pub fn upload_progress(
        mut self,
        hook: impl Fn(&UploadRecord, &[UploadRecord], f64) + Send + Sync + 'static,
    ) -> Self {
        self.upload_progress = Some(Arc::new(hook));
        self
    }

    /// Observe a record after it has been marked completed and written back
    pub fn file_uploaded(
        mut self,
        hook: impl Fn(&UploadRecord, &[UploadRecord]) + Send + Sync + 'static,
    ) -> Self {
        self.file_uploaded = Some(Arc::new(hook));
        self
    }

    pub(crate) fn overrides_for(
        &self,
        record: &UploadRecord,
        all: &[UploadRecord],
    ) -> RequestOverrides {
        self.before_upload
            .as_ref()
            .map(|hook| hook(record, all))
            .unwrap_or_default()
    }

    pub(crate) fn notify_progress(&self, record: &UploadRecord, all: &[UploadRecord], fraction: f64) {
        if let Some(hook) = &self.upload_progress {
            hook(record, all, fraction);
        }
    }

    pub(crate) fn notify_uploaded(&self, record: &UploadRecord, all: &[UploadRecord]) {
        if let Some(hook) = &self.file_uploaded {
            hook(record, all);
        }
    }

    pub(crate) fn wants_progress(&self) -> bool {
        self.upload_progress.is_some()
    }
}

impl fmt::Debug for UploadHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadHooks")
            .field("before_upload", &self.before_upload.is_some())
            .field("upload_progress", &self.upload_progress.is_some())
            .field("file_uploaded", &self.file_uploaded.is_some())
            .finish()
    }
}
