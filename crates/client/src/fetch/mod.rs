//! Network transport boundary.
//!
//! The interception layer only needs `perform(request) -> response stream`.
//! [`Transport`] is that seam; [`FetchClient`] implements it on reqwest.
//!
//! ### Transport behaviour
//! - Method, URL and headers are sent as given (the handler adds the
//!   loop-prevention marker before calling in)
//! - Redirects are followed up to `max_redirects`; the final URL is reported
//! - Bodies are exposed as a byte stream and never buffered here

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::time::Duration;

use offcache_core::{Error, Headers, Request};

/// Streamed response body.
pub type BodyStream = BoxStream<'static, Result<Bytes, Error>>;

/// Response head plus a body stream.
pub struct TransportResponse {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub headers: Headers,
    pub body: BodyStream,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Performs the real network exchange for a forwarded request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(&self, request: &Request) -> Result<TransportResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offcache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "offcache/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5 }
    }
}

impl From<&offcache_core::AppConfig> for FetchConfig {
    fn from(config: &offcache_core::AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), max_redirects: config.max_redirects }
    }
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn header_map(headers: &Headers) -> Result<HeaderMap, Error> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid header name {name:?}: {e}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| Error::InvalidInput(format!("invalid header value: {e}")))?;
        map.append(name, value);
    }
    Ok(map)
}

/// Flatten a header map. Values that are not visible ASCII are decoded as
/// ISO-8859-1 (obs-text) so no header is lost.
fn header_list(map: &HeaderMap) -> Headers {
    map.iter()
        .map(|(name, value)| {
            let value = match value.to_str() {
                Ok(v) => v.to_string(),
                Err(_) => {
                    tracing::debug!(header = %name, "decoding non-ASCII header value as latin-1");
                    value.as_bytes().iter().map(|&b| char::from(b)).collect()
                }
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() { Error::Transport(format!("timeout: {e}")) } else { Error::Transport(format!("network error: {e}")) }
}

#[async_trait]
impl Transport for FetchClient {
    async fn perform(&self, request: &Request) -> Result<TransportResponse, Error> {
        let method = Method::from_bytes(request.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {:?}: {e}", request.method)))?;
        let url = reqwest::Url::parse(request.url.trim()).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let response = self
            .http
            .request(method, url)
            .headers(header_map(&request.headers)?)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = header_list(response.headers());

        tracing::debug!("forwarded {} -> {} ({})", request.url, final_url, status);

        let body = response.bytes_stream().map(|chunk| chunk.map_err(transport_error)).boxed();

        Ok(TransportResponse { url: final_url, status, headers, body })
    }
}
