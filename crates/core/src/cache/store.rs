//! Storage abstraction shared by every cache backend.

use async_trait::async_trait;

use super::entry::CacheEntry;
use super::key::CacheKey;
use crate::Error;

/// Persistent key → entry mapping.
///
/// `write` must be atomic with respect to concurrent readers and crashes:
/// a reader observes either the previous complete entry or the new one.
/// Concurrent writers to one key resolve as last-writer-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn exists(&self, key: &CacheKey) -> Result<bool, Error>;

    /// Returns `None` when no entry is stored under `key`.
    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error>;

    async fn write(&self, entry: &CacheEntry) -> Result<(), Error>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, key: &CacheKey) -> Result<bool, Error>;

    /// Opaque locator for diagnostics (a file path, a database URI...).
    fn locator(&self, key: &CacheKey) -> String;
}
