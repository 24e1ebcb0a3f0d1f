//! Cached response snapshot.

use chrono::{SecondsFormat, Utc};

use super::key::CacheKey;
use crate::request::Headers;

/// A complete captured response.
///
/// Stores only ever persist or return whole entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
    /// RFC3339 UTC, second precision.
    pub stored_at: String,
}

impl CacheEntry {
    /// New entry stamped with the current time.
    pub fn new(key: CacheKey, url: impl Into<String>, status: u16, headers: Headers, body: Vec<u8>) -> Self {
        Self { key, url: url.into(), status, headers, body, stored_at: now_rfc3339() }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Host of the entry's URL, used by host-scoped purges.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
