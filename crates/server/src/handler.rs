//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheInspectParams, CachePurgeParams, inspect_impl, purge_impl};
use crate::tools::schemes::{self, SchemesSetParams};
use crate::tools::{OfflineFetchParams, offline_fetch_impl};

use offcache_client::Interceptor;
use offcache_core::{CacheDb, PolicySignal};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Empty parameter set for argument-less tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NoParams {}

/// The main MCP server handler for offcache.
#[derive(Clone)]
pub struct OffcacheServer {
    tool_router: ToolRouter<Self>,
    interceptor: Interceptor,
    /// Present when the SQLite store is in use; enables purging.
    db: Option<Arc<CacheDb>>,
    policy: PolicySignal,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OffcacheServer {
    /// Create a new server handler.
    pub fn new(interceptor: Interceptor, db: Option<Arc<CacheDb>>, policy: PolicySignal) -> Self {
        Self { tool_router: Self::tool_router(), interceptor, db, policy }
    }

    /// Fetch a URL through the offline cache.
    #[tool(
        description = "Fetch a URL through the offline cache. Depending on policy (prefer_cache, prefer_network, offline_only) the response is replayed from the cache or fetched and captured."
    )]
    async fn offline_fetch(&self, params: Parameters<OfflineFetchParams>) -> Result<CallToolResult, McpError> {
        offline_fetch_impl(&self.interceptor, self.policy, params.0).await
    }

    /// Inspect the cache entry for a request.
    #[tool(description = "Show the cache key, storage locator and stored entry for a request without any network access.")]
    async fn cache_inspect(&self, params: Parameters<CacheInspectParams>) -> Result<CallToolResult, McpError> {
        inspect_impl(&self.interceptor, params.0).await
    }

    /// Purge cached entries.
    #[tool(description = "Purge cached responses by age (older_than_days), host, or count (max_entries).")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(self.db.as_deref(), params.0).await
    }

    #[tool(description = "List the URL schemes currently intercepted.")]
    async fn schemes_get(&self, _params: Parameters<NoParams>) -> Result<CallToolResult, McpError> {
        schemes::get_impl(self.interceptor.registry())
    }

    #[tool(description = "Replace the set of intercepted URL schemes. An empty list disables interception.")]
    async fn schemes_set(&self, params: Parameters<SchemesSetParams>) -> Result<CallToolResult, McpError> {
        schemes::set_impl(self.interceptor.registry(), params.0)
    }
}

impl ServerHandler for OffcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
