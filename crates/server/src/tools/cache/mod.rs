//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and purging the response cache.

pub mod inspect;
pub mod purge;

pub use inspect::{CacheInspectParams, inspect_impl};
pub use purge::{CachePurgeParams, purge_impl};
