//! offline_fetch tool implementation.
//!
//! Runs a request through the interceptor and returns the buffered response,
//! noting whether it was replayed from the cache.

use offcache_client::{CollectingSink, Interceptor, Outcome};
use offcache_core::{Error, Headers, PolicySignal, cache::derive_key};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{RequestParams, json_result};

/// Parameters for the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchParams {
    #[serde(flatten)]
    pub request: RequestParams,

    /// Cache policy for this request. Defaults to the server's configured policy.
    #[serde(default)]
    pub policy: Option<PolicySignal>,
}

/// Output from the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchOutput {
    pub url: String,
    /// Cache key of the request.
    pub key: Option<String>,
    pub status: u16,
    pub headers: Headers,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
    /// True when the response was replayed from the cache.
    pub from_cache: bool,
}

/// Implementation of the offline_fetch tool.
pub async fn offline_fetch_impl(
    interceptor: &Interceptor, default_policy: PolicySignal, params: OfflineFetchParams,
) -> Result<CallToolResult, McpError> {
    let request = params.request.to_request()?;
    let policy = params.policy.unwrap_or(default_policy);
    let key = derive_key(&request, interceptor.rules()).ok();

    let mut sink = CollectingSink::new();
    let from_cache = match interceptor.handle(&request, policy, &mut sink).await {
        Outcome::Completed { from_cache } => from_cache,
        Outcome::Failed(e) => return Err(e.into()),
        Outcome::Rejected(reason) => {
            return Err(Error::UnsupportedScheme(format!("{} not intercepted ({reason:?})", request.url)).into());
        }
        Outcome::Cancelled => return Err(Error::Transport("request cancelled".into()).into()),
    };

    let output = OfflineFetchOutput {
        url: request.url,
        key: key.map(|k| k.to_string()),
        status: sink.status.unwrap_or_default(),
        headers: sink.headers,
        body: String::from_utf8_lossy(&sink.body).into_owned(),
        body_bytes: sink.body.len(),
        from_cache,
    };
    json_result(&output)
}
