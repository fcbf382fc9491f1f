//! File-based blob storage
//!
//! One file per key under the cache directory, named by the key's hex digest.
//! Writes go to `<key>.tmp` and are renamed into place, so readers never see a
//! partially written blob. The file modification time is the only persisted
//! freshness signal.

use crate::error::{CacheError, Result};
use crate::key::CacheKey;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const TEMP_SUFFIX: &str = ".tmp";

/// Durable blob store with readers-writer access discipline
pub struct DiskStore {
    root: PathBuf,
    /// Shared for reads, exclusive for write/delete/clear
    lock: RwLock<()>,
}

impl DiskStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| CacheError::DirectoryCreationFailed(Box::new(e)))?;
        info!(cache_dir = ?root, "Disk cache initialized");
        Ok(Self {
            root,
            lock: RwLock::new(()),
        })
    }

    /// Location of the committed blob for `key`
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn temp_path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}{}", key, TEMP_SUFFIX))
    }

    /// Atomically replace the blob for `key`. The committed file carries a
    /// fresh modification time.
    pub async fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<()> {
        let _guard = self.lock.write().await;
        let tmp = self.temp_path_for(key);
        let path = self.path_for(key);

        if let Err(e) = write_then_rename(&tmp, &path, bytes).await {
            warn!(key = %key, error = %e, "Failed to write cache file");
            let _ = fs::remove_file(&tmp).await;
            return Err(CacheError::write(e));
        }

        debug!(key = %key, size = bytes.len(), "Wrote cache file");
        Ok(())
    }

    /// Read the blob for `key`, or [`CacheError::NotFound`]
    pub async fn read(&self, key: &CacheKey) -> Result<Vec<u8>> {
        let _guard = self.lock.read().await;
        fs::read(self.path_for(key)).await.map_err(CacheError::read)
    }

    /// Last write time of the blob for `key`
    pub async fn stat_timestamp(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        let _guard = self.lock.read().await;
        let metadata = fs::metadata(self.path_for(key)).await.ok()?;
        metadata.modified().ok().map(DateTime::<Utc>::from)
    }

    /// Remove the blob for `key`. Absence is not an error.
    pub async fn delete(&self, key: &CacheKey) -> Result<()> {
        let _guard = self.lock.write().await;
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => {
                debug!(key = %key, "Deleted cache file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::write(e)),
        }
    }

    /// Remove every file under the cache directory, including stray temp files
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.lock.write().await;
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return fs::create_dir_all(&self.root)
                    .await
                    .map_err(|e| CacheError::DirectoryCreationFailed(Box::new(e)));
            }
            Err(e) => return Err(CacheError::write(e)),
        };

        let mut removed = 0usize;
        while let Some(entry) = dir.next_entry().await.map_err(CacheError::write)? {
            let file_type = entry.file_type().await.map_err(CacheError::write)?;
            if file_type.is_dir() {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::write(e)),
            }
        }

        info!(removed, cache_dir = ?self.root, "Cleared disk cache");
        Ok(())
    }

    /// Keys of all committed blobs
    pub async fn keys(&self) -> Result<Vec<CacheKey>> {
        let _guard = self.lock.read().await;
        let mut dir = fs::read_dir(&self.root).await.map_err(CacheError::read)?;
        let mut keys = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(CacheError::read)? {
            if let Some(key) = entry.file_name().to_str().and_then(CacheKey::from_file_name) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Total size in bytes of all committed blobs. Unreadable entries count as zero.
    pub async fn total_size(&self) -> u64 {
        let Ok(keys) = self.keys().await else {
            return 0;
        };
        let _guard = self.lock.read().await;
        let mut size = 0;
        for key in keys {
            if let Ok(metadata) = fs::metadata(self.path_for(&key)).await {
                size += metadata.len();
            }
        }
        size
    }

    /// Overwrite the modification time of the blob for `key`
    pub async fn set_timestamp(&self, key: &CacheKey, timestamp: DateTime<Utc>) -> Result<()> {
        let _guard = self.lock.write().await;
        let path = self.path_for(key);
        let modified = SystemTime::from(timestamp);

        tokio::task::spawn_blocking(move || {
            std::fs::File::options()
                .write(true)
                .open(&path)?
                .set_modified(modified)
        })
        .await
        .map_err(|e| CacheError::write(io::Error::other(e)))?
        .map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                CacheError::NotFound
            } else {
                CacheError::write(e)
            }
        })
    }

    /// Delete every blob older than `expiration_secs`. Returns the keys removed.
    pub async fn purge_expired(&self, expiration_secs: u64) -> Result<Vec<CacheKey>> {
        let _guard = self.lock.write().await;
        let now = Utc::now();
        let mut dir = fs::read_dir(&self.root).await.map_err(CacheError::read)?;
        let mut purged = Vec::new();

        while let Some(entry) = dir.next_entry().await.map_err(CacheError::read)? {
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(CacheKey::from_file_name) else {
                continue;
            };
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => DateTime::<Utc>::from(modified),
                Err(_) => continue,
            };
            if is_expired(modified, expiration_secs, now) {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => {
                        debug!(key = %key, "Purged expired cache file");
                        purged.push(key);
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(CacheError::write(e)),
                }
            }
        }

        Ok(purged)
    }
}

async fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(tmp, path).await
}

/// Whether an entry last written at `modified` is older than `expiration_secs`
pub fn is_expired(modified: DateTime<Utc>, expiration_secs: u64, now: DateTime<Utc>) -> bool {
    let max_age = i64::try_from(expiration_secs).unwrap_or(i64::MAX);
    (now - modified).num_seconds() > max_age
}
