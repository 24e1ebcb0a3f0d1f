//! Persistent response cache.
//!
//! This module provides the storage side of the interception layer:
//!
//! - Deterministic SHA-256 cache keys over normalized requests
//! - The [`CacheStore`] trait with atomic per-key writes
//! - A SQLite backend (WAL mode, automatic migrations, purge strategies)
//! - A file-per-entry backend using temp-file + rename

pub mod connection;
pub mod entries;
pub mod entry;
pub mod fs;
pub mod key;
pub mod migrations;
pub mod store;
pub mod url;

pub use crate::Error;

pub use connection::CacheDb;
pub use entry::CacheEntry;
pub use fs::FsCacheStore;
pub use key::{CacheKey, KeyRules, derive_key};
pub use store::CacheStore;
