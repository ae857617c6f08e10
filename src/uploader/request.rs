//! Request construction: config defaults, the per-file name header, then hook overrides.

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::config::RequestConfig;
use crate::error::Result;
use crate::hooks::RequestOverrides;
use crate::transport::UploadRequest;
use crate::types::UploadRecord;

/// Header carrying the percent-encoded original file name
pub(crate) const X_FILE_NAME: &str = "x-file-name";

/// Method and static headers resolved once from [`RequestConfig`]
#[derive(Clone, Debug)]
pub(crate) struct RequestTemplate {
    pub(crate) method: Method,
    pub(crate) headers: HeaderMap,
}

impl RequestTemplate {
    pub(crate) fn from_config(config: &RequestConfig) -> Result<Self> {
        Ok(Self {
            method: config.parsed_method()?,
            headers: config.static_headers()?,
        })
    }

    /// Build the request for `record`
    ///
    /// Precedence, lowest first: `X-File-Name`, configured headers, hook
    /// headers. `url` and `method` from the hook replace the record's
    /// destination and the configured method.
    pub(crate) fn build(&self, record: &UploadRecord, overrides: RequestOverrides) -> UploadRequest {
        let mut headers = HeaderMap::new();

        let encoded = urlencoding::encode(record.name());
        match HeaderValue::from_str(&encoded) {
            Ok(value) => {
                headers.insert(X_FILE_NAME, value);
            }
            Err(e) => {
                tracing::warn!(
                    record_id = %record.id,
                    error = %e,
                    "could not encode file name header, sending without it"
                );
            }
        }

        merge_headers(&mut headers, &self.headers);
        merge_headers(&mut headers, &overrides.headers);

        UploadRequest {
            record_id: record.id,
            file_name: record.name().to_string(),
            url: overrides.url.unwrap_or_else(|| record.destination.clone()),
            method: overrides.method.unwrap_or_else(|| self.method.clone()),
            headers,
            body: record.payload.bytes.clone(),
            timeout: overrides.timeout,
        }
    }
}

/// Replace every header named in `source`, keeping multi-valued entries intact
fn merge_headers(target: &mut HeaderMap, source: &HeaderMap) {
    for name in source.keys() {
        target.remove(name);
    }
    for (name, value) in source {
        target.append(name.clone(), value.clone());
    }
}
