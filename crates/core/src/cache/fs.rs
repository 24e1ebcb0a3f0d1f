//! File-per-entry cache store.
//!
//! Layout: `<root>/<aa>/<key>.entry` where `aa` is the key's first two hex
//! characters. A file holds one JSON metadata line followed by the raw body.
//!
//! Writes go to a uniquely named temporary file in the same directory and
//! are renamed over the canonical path once flushed, so a reader or a crash
//! mid-write never exposes a truncated entry.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::store::CacheStore;
use crate::Error;
use crate::request::Headers;

const ENTRY_EXTENSION: &str = "entry";

/// Metadata line preceding the body in an entry file.
#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    url: String,
    status: u16,
    headers: Headers,
    stored_at: String,
    body_len: usize,
}

/// Filesystem-backed cache store.
#[derive(Debug, Clone)]
pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| Error::Storage(format!("failed to create {}: {e}", root.display())))?;
        let root = fs::canonicalize(&root)
            .await
            .map_err(|e| Error::Storage(format!("failed to resolve {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical path of the entry for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(key.shard())
            .join(format!("{key}.{ENTRY_EXTENSION}"))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    PathBuf::from(name)
}

fn encode(entry: &CacheEntry) -> Result<Vec<u8>, Error> {
    let header = EntryHeader {
        url: entry.url.clone(),
        status: entry.status,
        headers: entry.headers.clone(),
        stored_at: entry.stored_at.clone(),
        body_len: entry.body.len(),
    };
    let mut bytes = serde_json::to_vec(&header)?;
    bytes.push(b'\n');
    bytes.extend_from_slice(&entry.body);
    Ok(bytes)
}

fn decode(key: &CacheKey, bytes: &[u8]) -> Result<CacheEntry, Error> {
    let split = bytes
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| Error::Storage(format!("corrupt entry {key}: missing header")))?;
    let header: EntryHeader = serde_json::from_slice(&bytes[..split])?;
    let body = &bytes[split + 1..];
    if body.len() != header.body_len {
        return Err(Error::Storage(format!(
            "corrupt entry {key}: expected {} body bytes, found {}",
            header.body_len,
            body.len()
        )));
    }

    Ok(CacheEntry {
        key: key.clone(),
        url: header.url,
        status: header.status,
        headers: header.headers,
        body: body.to_vec(),
        stored_at: header.stored_at,
    })
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn exists(&self, key: &CacheKey) -> Result<bool, Error> {
        match fs::metadata(self.entry_path(key)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Storage(format!("failed to stat entry {key}: {e}"))),
        }
    }

    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        match fs::read(self.entry_path(key)).await {
            Ok(bytes) => decode(key, &bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("failed to read entry {key}: {e}"))),
        }
    }

    async fn write(&self, entry: &CacheEntry) -> Result<(), Error> {
        let path = self.entry_path(&entry.key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("failed to create {}: {e}", parent.display())))?;
        }

        let bytes = encode(entry)?;
        let tmp = temp_path(&path);

        let result: std::io::Result<()> = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp).await;
            return Err(Error::Storage(format!("failed to write entry {}: {e}", entry.key)));
        }

        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, Error> {
        match fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Storage(format!("failed to delete entry {key}: {e}"))),
        }
    }

    fn locator(&self, key: &CacheKey) -> String {
        self.entry_path(key).display().to_string()
    }
}
