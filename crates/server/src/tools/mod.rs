//! MCP tool implementations.
//!
//! This module contains all tools exposed by the offcache server.

pub mod cache;
pub mod offline_fetch;
pub mod schemes;

use std::collections::BTreeMap;

use offcache_core::{Error, Request};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use offline_fetch::{OfflineFetchParams, offline_fetch_impl};

/// Request description shared by the fetch and inspect tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RequestParams {
    /// The URL to request.
    pub url: String,

    /// HTTP method (default: GET). Only GET and HEAD are cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers. `accept` and `accept-language` participate in the cache key by default.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

impl RequestParams {
    pub fn to_request(&self) -> Result<Request, Error> {
        if self.url.trim().is_empty() {
            return Err(Error::InvalidInput("url must not be empty".into()));
        }
        let mut request = Request::new(self.method.clone(), self.url.trim());
        for (name, value) in &self.headers {
            request = request.with_header(name.clone(), value.clone());
        }
        Ok(request)
    }
}

/// Serialize a tool output as pretty JSON text content.
pub fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
