//! Entry CRUD and purge operations on the SQLite store.
//!
//! Every write is a single UPSERT statement, so SQLite's transaction
//! guarantees give readers either the old row or the new row.

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::entry::CacheEntry;
use super::key::CacheKey;
use super::store::CacheStore;
use crate::Error;
use crate::request::Headers;

#[async_trait]
impl CacheStore for CacheDb {
    async fn exists(&self, key: &CacheKey) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM entries WHERE key = ?1)", params![key], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        let key = key.clone();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt =
                    conn.prepare("SELECT url, status, headers_json, body, stored_at FROM entries WHERE key = ?1")?;

                let result = stmt.query_row(params![key.as_str()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                });

                match result {
                    Ok((url, status, headers_json, body, stored_at)) => {
                        let headers: Headers = serde_json::from_str(&headers_json)?;
                        Ok(Some(CacheEntry { key, url, status, headers, body, stored_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn write(&self, entry: &CacheEntry) -> Result<(), Error> {
        let entry = entry.clone();
        let host = entry.host();
        let headers_json = serde_json::to_string(&entry.headers)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (key, url, host, status, headers_json, body, stored_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(key) DO UPDATE SET
                        url = excluded.url,
                        host = excluded.host,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        entry.key.as_str(),
                        &entry.url,
                        &host,
                        entry.status,
                        &headers_json,
                        &entry.body,
                        &entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM entries WHERE key = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    fn locator(&self, key: &CacheKey) -> String {
        format!("{}#{key}", self.location)
    }
}

impl CacheDb {
    /// Number of stored entries.
    pub async fn count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries stored more than `days` days ago.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_older_than(&self, days: i64) -> Result<u64, Error> {
        let cutoff = Duration::try_days(days)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or_else(|| Error::InvalidInput(format!("older_than_days out of range: {days}")))?
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE stored_at < ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries for `host` and its subdomains.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_by_host(&self, host: &str) -> Result<u64, Error> {
        let host = host.trim().to_lowercase();
        let subdomains = format!("%.{host}");
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count =
                    conn.execute("DELETE FROM entries WHERE host = ?1 OR host LIKE ?2", params![host, subdomains])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge oldest entries until count <= max_entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_lru(&self, max_entries: usize) -> Result<u64, Error> {
        let max = i64::try_from(max_entries).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE key IN (
                    SELECT key FROM entries ORDER BY stored_at ASC, rowid ASC LIMIT ?1
                )",
                    params![to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::{KeyRules, derive_key};
    use crate::request::Request;

    fn make_test_entry(url: &str, body: &[u8]) -> CacheEntry {
        let key = derive_key(&Request::get(url), &KeyRules::default()).unwrap();
        CacheEntry::new(
            key,
            url,
            200,
            vec![("Content-Type".into(), "text/html".into()), ("X-Trace".into(), "1".into())],
            body.to_vec(),
        )
    }

    #[tokio::test]
    async fn test_write_and_read_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = make_test_entry("https://example.com/a", b"\x00binary\xffbody");

        db.write(&entry).await.unwrap();

        assert!(db.exists(&entry.key).await.unwrap());
        let retrieved = db.read(&entry.key).await.unwrap().unwrap();
        assert_eq!(retrieved, entry);
    }

    #[tokio::test]
    async fn test_read_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = make_test_entry("https://example.com/missing", b"");
        assert!(!db.exists(&entry.key).await.unwrap());
        assert!(db.read(&entry.key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = make_test_entry("https://example.com/a", b"old");
        let mut second = make_test_entry("https://example.com/a", b"new");
        second.status = 203;

        db.write(&first).await.unwrap();
        db.write(&second).await.unwrap();

        let retrieved = db.read(&first.key).await.unwrap().unwrap();
        assert_eq!(retrieved.body, b"new");
        assert_eq!(retrieved.status, 203);
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = make_test_entry("https://example.com/a", b"x");
        db.write(&entry).await.unwrap();

        assert!(db.delete(&entry.key).await.unwrap());
        assert!(!db.delete(&entry.key).await.unwrap());
        assert!(!db.exists(&entry.key).await.unwrap());
    }

    #[tokio::test]
    async fn test_locator() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = make_test_entry("https://example.com/a", b"x");
        assert_eq!(db.locator(&entry.key), format!("sqlite://:memory:#{}", entry.key));
    }

    #[tokio::test]
    async fn test_purge_by_host() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.write(&make_test_entry("https://example.com/page1", b"1")).await.unwrap();
        db.write(&make_test_entry("https://cdn.example.com/page2", b"2")).await.unwrap();
        db.write(&make_test_entry("https://notexample.com/page3", b"3")).await.unwrap();

        let deleted = db.purge_by_host("example.com").await.unwrap();
        assert_eq!(deleted, 2);

        let other = make_test_entry("https://notexample.com/page3", b"3");
        assert!(db.exists(&other.key).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_lru() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut oldest = make_test_entry("https://example.com/1", b"1");
        oldest.stored_at = "2020-01-01T00:00:00Z".into();
        db.write(&oldest).await.unwrap();
        db.write(&make_test_entry("https://example.com/2", b"2")).await.unwrap();
        db.write(&make_test_entry("https://example.com/3", b"3")).await.unwrap();

        assert_eq!(db.purge_lru(2).await.unwrap(), 1);
        assert!(!db.exists(&oldest.key).await.unwrap());
        assert_eq!(db.count().await.unwrap(), 2);
        assert_eq!(db.purge_lru(5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut stale = make_test_entry("https://example.com/old", b"1");
        stale.stored_at = "2020-01-01T00:00:00Z".into();
        let fresh = make_test_entry("https://example.com/new", b"2");
        db.write(&stale).await.unwrap();
        db.write(&fresh).await.unwrap();

        assert_eq!(db.purge_older_than(30).await.unwrap(), 1);
        assert!(db.exists(&fresh.key).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_older_than_out_of_range() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.write(&make_test_entry("https://example.com/a", b"1")).await.unwrap();

        assert!(matches!(db.purge_older_than(i64::MAX / 1000).await, Err(Error::InvalidInput(_))));
        assert!(matches!(db.purge_older_than(i64::MAX).await, Err(Error::InvalidInput(_))));
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_lru_huge_limit_keeps_everything() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.write(&make_test_entry("https://example.com/1", b"1")).await.unwrap();
        db.write(&make_test_entry("https://example.com/2", b"2")).await.unwrap();

        assert_eq!(db.purge_lru(usize::MAX).await.unwrap(), 0);
        assert_eq!(db.count().await.unwrap(), 2);
    }
}
