//! cache_purge tool implementation.
//!
//! Purges cache entries by age, host, or count.

use offcache_core::{CacheDb, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Purge entries stored more than this many days ago.
    pub older_than_days: Option<i64>,

    /// Purge entries for this host and its subdomains.
    pub host: Option<String>,

    /// Keep only the newest N entries (LRU purge).
    pub max_entries: Option<usize>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
    /// Entries left afterwards.
    pub remaining: u64,
}

/// Implementation of the cache_purge tool.
///
/// Purging is only available on the SQLite store; `cache` is `None` otherwise.
pub async fn purge_impl(cache: Option<&CacheDb>, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let Some(cache) = cache else {
        return Err(Error::InvalidInput("cache_purge requires the sqlite store".to_string()).into());
    };

    if params.older_than_days.is_none() && params.host.is_none() && params.max_entries.is_none() {
        return Err(Error::InvalidInput(
            "At least one of older_than_days, host, or max_entries must be specified".to_string(),
        )
        .into());
    }

    let mut deleted_total = 0u64;

    if let Some(days) = params.older_than_days {
        if days < 0 {
            return Err(Error::InvalidInput("older_than_days must not be negative".to_string()).into());
        }
        deleted_total += cache.purge_older_than(days).await?;
    }

    if let Some(host) = params.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
        deleted_total += cache.purge_by_host(host).await?;
    }

    if let Some(max_entries) = params.max_entries {
        deleted_total += cache.purge_lru(max_entries).await?;
    }

    tracing::info!(deleted = deleted_total, "purged cache entries");

    let output = CachePurgeOutput { deleted: deleted_total, remaining: cache.count().await? };
    json_result(&output)
}
