//! Configuration types for upload-queue

use crate::error::{Error, Result};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Defaults applied to every upload request before hooks run
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestConfig {
    /// HTTP method for uploads (default: "POST")
    #[serde(default = "default_method")]
    pub method: String,

    /// Value of the `X-Requested-With` header (default: "XMLHttpRequest", None = omit)
    #[serde(default = "default_requested_with")]
    pub requested_with: Option<String>,

    /// Value of the `Content-Type` header (default: "application/octet-stream")
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Extra static headers sent with every upload
    ///
    /// Applied after the built-in headers, so an entry here replaces a built-in
    /// header of the same name. Hook overrides are applied after these.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            requested_with: default_requested_with(),
            content_type: default_content_type(),
            default_headers: BTreeMap::new(),
        }
    }
}

/// Event broadcast settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventConfig {
    /// Broadcast channel buffer size (default: 1000)
    ///
    /// Slow subscribers that fall further behind than this lose the oldest events.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Main configuration for [`UploadQueue`](crate::UploadQueue)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Per-request defaults
    #[serde(default)]
    pub request: RequestConfig,

    /// Event channel settings
    #[serde(default)]
    pub events: EventConfig,
}

impl Config {
    /// Check the configuration for values that can never produce a valid request
    pub fn validate(&self) -> Result<()> {
        self.request.parsed_method()?;
        self.request.static_headers()?;

        if self.events.channel_capacity == 0 {
            return Err(Error::config(
                "events.channel_capacity",
                "channel capacity must be greater than zero",
            ));
        }

        Ok(())
    }
}

impl RequestConfig {
    /// Parse the configured method name into a [`Method`]
    pub fn parsed_method(&self) -> Result<Method> {
        Method::from_bytes(self.method.trim().as_bytes()).map_err(|_| {
            Error::config(
                "request.method",
                format!("unsupported method {:?}", self.method),
            )
        })
    }

    /// Build the static header set (everything except `X-File-Name`)
    pub fn static_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(requested_with) = &self.requested_with {
            insert_header(&mut headers, "x-requested-with", requested_with)?;
        }
        insert_header(&mut headers, "content-type", &self.content_type)?;

        for (name, value) in &self.default_headers {
            insert_header(&mut headers, name, value)?;
        }

        Ok(headers)
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    headers.insert(header_name, header_value);
    Ok(())
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_requested_with() -> Option<String> {
    Some("XMLHttpRequest".to_string())
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

fn default_channel_capacity() -> usize {
    1000
}
