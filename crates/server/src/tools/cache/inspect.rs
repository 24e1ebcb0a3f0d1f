//! cache_inspect tool implementation.
//!
//! Reports the key, locator and stored entry for a request without touching
//! the network.

use offcache_client::Interceptor;
use offcache_core::{CacheStore, PolicySignal, cache::derive_key};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::{RequestParams, json_result};

/// Parameters for the cache_inspect tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInspectParams {
    #[serde(flatten)]
    pub request: RequestParams,

    /// Policy to evaluate `serves_from_cache` under (default: prefer_cache).
    #[serde(default)]
    pub policy: Option<PolicySignal>,
}

/// Stored entry summary.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntrySummary {
    /// Final URL the response was captured from.
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body_bytes: usize,
    pub stored_at: String,
}

/// Output from the cache_inspect tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInspectOutput {
    pub key: String,
    pub locator: String,
    /// Whether the request's scheme and method are intercepted at all.
    pub interceptable: bool,
    pub exists: bool,
    /// Whether a request under `policy` would be answered from the cache.
    pub serves_from_cache: bool,
    pub entry: Option<EntrySummary>,
}

/// Implementation of the cache_inspect tool.
pub async fn inspect_impl(interceptor: &Interceptor, params: CacheInspectParams) -> Result<CallToolResult, McpError> {
    let request = params.request.to_request()?;
    let policy = params.policy.unwrap_or(PolicySignal::PreferCache);

    let key = derive_key(&request, interceptor.rules())?;
    let entry = interceptor.store().read(&key).await?.map(|entry| EntrySummary {
        content_type: entry.content_type().map(str::to_string),
        body_bytes: entry.body.len(),
        url: entry.url,
        status: entry.status,
        stored_at: entry.stored_at,
    });

    let output = CacheInspectOutput {
        locator: interceptor.cache_path_for_request(&request)?,
        key: key.to_string(),
        interceptable: interceptor.can_handle(&request),
        exists: entry.is_some(),
        serves_from_cache: interceptor.use_cache(&request, policy).await,
        entry,
    };
    json_result(&output)
}
