//! Deterministic cache key derivation.
//!
//! A key is the hex SHA-256 of the uppercased method, the normalized URL and
//! the allow-listed request headers. Every part is length-prefixed before it
//! is hashed, so no header value can impersonate another header. Nothing
//! volatile enters the digest, so keys are stable across processes and restarts.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use super::url::normalize;
use crate::Error;
use crate::request::Request;

/// Headers that participate in the key unless configured otherwise.
pub const DEFAULT_CACHE_HEADERS: &[&str] = &["accept", "accept-language"];

/// Opaque, validated cache key (64 lowercase hex chars).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Parse a key received from outside (e.g. a tool argument or a file name).
    pub fn parse(value: &str) -> Result<Self, Error> {
        if value.len() == 64 && value.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::InvalidKey)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First two hex chars, used to shard file-backed stores.
    pub fn shard(&self) -> &str {
        &self.0[..2]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which request headers are cache-significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRules {
    headers: Vec<String>,
}

impl Default for KeyRules {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_HEADERS)
    }
}

impl KeyRules {
    /// Build rules from an allow-list of header names (case-insensitive).
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut headers: Vec<String> = headers
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        headers.sort();
        headers.dedup();
        Self { headers }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// `(name, value)` pairs for the allow-listed headers present on `request`,
    /// in allow-list order. Repeated headers are joined with `,`.
    fn vary_headers(&self, request: &Request) -> Vec<(&str, String)> {
        self.headers
            .iter()
            .filter_map(|name| {
                let values: Vec<&str> = request.header_values(name).map(str::trim).collect();
                (!values.is_empty()).then(|| (name.as_str(), values.join(",")))
            })
            .collect()
    }
}

/// Feed one length-prefixed field into the digest.
fn update_field(hasher: &mut Sha256, field: &[u8]) {
    hasher.update((field.len() as u64).to_be_bytes());
    hasher.update(field);
}

/// Hash the canonical request parts into a key.
pub fn compute_cache_key(method: &str, url: &Url, vary_headers: &[(&str, String)]) -> CacheKey {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, method.as_bytes());
    update_field(&mut hasher, url.as_str().as_bytes());
    hasher.update((vary_headers.len() as u64).to_be_bytes());
    for (name, value) in vary_headers {
        update_field(&mut hasher, name.as_bytes());
        update_field(&mut hasher, value.as_bytes());
    }
    CacheKey(hex::encode(hasher.finalize()))
}

/// Derive the cache key for a request.
///
/// Fails only when the URL cannot be parsed.
pub fn derive_key(request: &Request, rules: &KeyRules) -> Result<CacheKey, Error> {
    let url = normalize(&request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method = request.method.trim().to_ascii_uppercase();
    Ok(compute_cache_key(&method, &url, &rules.vary_headers(request)))
}
