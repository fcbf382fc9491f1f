//! Two-tier image caching: decoded images in memory, encoded blobs on disk

use crate::disk::{is_expired, DiskStore};
use crate::error::{CacheError, Result};
use crate::key::CacheKey;
use crate::memory::MemoryStore;
use crate::photo::Image;
use crate::types::{CacheConfig, CacheStats};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// An image cache with a bounded memory tier in front of a disk tier
pub struct ImageCache {
    /// Decoded images, LRU-bounded by count and cost
    memory: MemoryStore<Arc<Image>>,
    /// `None` when the cache directory could not be created
    disk: Option<DiskStore>,
    /// Shared for lookups, exclusive for anything that changes both tiers
    lock: RwLock<()>,
    /// Maximum age of a disk entry in seconds
    expiration_secs: u64,
    /// Cache hit counter
    hits: AtomicU64,
    /// Cache miss counter
    misses: AtomicU64,
}

/// Outcome of a lookup taken under the shared guard
enum Lookup {
    Hit(Arc<Image>),
    Miss,
    /// Expired or unusable entry, with the disk timestamp it was judged by
    Purge(DateTime<Utc>),
}

impl ImageCache {
    /// Create a cache from `config`. If the cache directory cannot be
    /// created the cache keeps working in memory only.
    pub async fn new(config: CacheConfig) -> Self {
        let memory = MemoryStore::new(config.count_limit, config.cost_limit);
        let disk = match DiskStore::open(&config.cache_dir).await {
            Ok(disk) => Some(disk),
            Err(e) => {
                warn!(
                    cache_dir = ?config.cache_dir,
                    error = %e,
                    "Disk cache unavailable, continuing with memory cache only"
                );
                None
            }
        };

        info!(
            count_limit = config.count_limit,
            cost_limit = config.cost_limit,
            expiration_secs = config.expiration_secs,
            persistent = disk.is_some(),
            "Image cache initialized"
        );

        Self {
            memory,
            disk,
            lock: RwLock::new(()),
            expiration_secs: config.expiration_secs,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Store an image for `source` on disk and in memory.
    ///
    /// A disk failure is reported but the memory entry stays valid.
    pub async fn cache_image(&self, image: Arc<Image>, source: &str) -> Result<()> {
        let key = CacheKey::derive(source);
        let encoded = match &self.disk {
            Some(_) => Some(encode(image.clone()).await),
            None => None,
        };

        let _guard = self.lock.write().await;
        let persisted = match (&self.disk, encoded) {
            (Some(disk), Some(Ok(bytes))) => disk.write(&key, &bytes).await.map(|()| bytes.len()),
            (_, Some(Err(e))) => Err(e),
            _ => Ok(0),
        };
        if persisted.is_err() {
            // Drop any older blob so the tiers agree
            self.delete_quietly(&key).await;
        }
        self.memory.put(key.clone(), image.clone(), image.cost());

        let size = persisted?;
        debug!(key = %key, size, "Cached image");
        Ok(())
    }

    /// Look up the image for `source`, checking memory before disk.
    ///
    /// Expired entries are purged from both tiers; unreadable or corrupt
    /// disk entries are deleted. Both count as a miss.
    pub async fn cached_image(&self, source: &str) -> Option<Arc<Image>> {
        let key = CacheKey::derive(source);
        let lookup = {
            let _guard = self.lock.read().await;
            self.lookup(&key).await
        };

        match lookup {
            Lookup::Hit(image) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(image)
            }
            Lookup::Miss => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Lookup::Purge(observed) => {
                self.purge_if_unchanged(&key, observed).await;
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Remove the image for `source` from both tiers
    pub async fn remove_image(&self, source: &str) -> Result<()> {
        let key = CacheKey::derive(source);
        let _guard = self.lock.write().await;
        self.memory.remove(&key);
        if let Some(disk) = &self.disk {
            disk.delete(&key).await?;
        }
        Ok(())
    }

    /// Drop every decoded image. Disk entries survive.
    pub fn clear_memory_cache(&self) {
        if self.memory.is_empty() {
            return;
        }
        let dropped = self.memory.len();
        self.memory.clear();
        debug!(dropped, "Cleared memory cache");
    }

    /// Remove every entry from both tiers
    pub async fn clear_cache(&self) -> Result<()> {
        let _guard = self.lock.write().await;
        self.memory.clear();
        if let Some(disk) = &self.disk {
            disk.clear().await?;
        }
        Ok(())
    }

    /// Delete every expired entry from both tiers. Returns the number removed.
    pub async fn purge_expired(&self) -> Result<usize> {
        let Some(disk) = &self.disk else {
            return Ok(0);
        };

        let _guard = self.lock.write().await;
        let purged = disk.purge_expired(self.expiration_secs).await?;
        for key in &purged {
            self.memory.remove(key);
        }
        Ok(purged.len())
    }

    pub fn set_count_limit(&self, count_limit: usize) {
        self.memory.set_count_limit(count_limit);
    }

    pub fn set_cost_limit(&self, cost_limit: u64) {
        self.memory.set_cost_limit(cost_limit);
    }

    pub fn count_limit(&self) -> usize {
        self.memory.count_limit()
    }

    pub fn cost_limit(&self) -> u64 {
        self.memory.cost_limit()
    }

    pub fn expiration_secs(&self) -> u64 {
        self.expiration_secs
    }

    pub fn disk_store(&self) -> Option<&DiskStore> {
        self.disk.as_ref()
    }

    /// Get current cache statistics
    pub async fn stats(&self) -> CacheStats {
        let (disk_entries, disk_size) = match &self.disk {
            Some(disk) => (
                disk.keys().await.map(|keys| keys.len()).unwrap_or(0),
                disk.total_size().await,
            ),
            None => (0, 0),
        };

        CacheStats {
            memory_entries: self.memory.len(),
            memory_cost: self.memory.total_cost(),
            evictions: self.memory.evictions(),
            disk_entries,
            disk_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn is_stale(&self, modified: DateTime<Utc>) -> bool {
        is_expired(modified, self.expiration_secs, Utc::now())
    }

    /// Caller holds the shared guard
    async fn lookup(&self, key: &CacheKey) -> Lookup {
        if let Some(image) = self.memory.get(key) {
            // A missing disk companion is not considered expired
            let modified = match &self.disk {
                Some(disk) => disk.stat_timestamp(key).await,
                None => None,
            };
            return match modified {
                Some(modified) if self.is_stale(modified) => {
                    debug!(key = %key, "Cache entry expired, removing from both tiers");
                    Lookup::Purge(modified)
                }
                _ => {
                    debug!(key = %key, "Memory cache hit");
                    Lookup::Hit(image)
                }
            };
        }

        let Some(disk) = &self.disk else {
            return Lookup::Miss;
        };
        let Some(modified) = disk.stat_timestamp(key).await else {
            debug!(key = %key, "Disk cache miss");
            return Lookup::Miss;
        };
        if self.is_stale(modified) {
            debug!(key = %key, modified = %modified, "Disk cache entry expired");
            return Lookup::Purge(modified);
        }

        match load_from_disk(disk, key).await {
            Ok(image) => {
                self.memory.put(key.clone(), image.clone(), image.cost());
                debug!(key = %key, "Disk cache hit, promoted to memory");
                Lookup::Hit(image)
            }
            Err(CacheError::NotFound) => Lookup::Miss,
            Err(e) => {
                warn!(key = %key, error = %e, "Unusable cache entry, removing");
                Lookup::Purge(modified)
            }
        }
    }

    /// Remove `key` from both tiers unless its blob was rewritten after
    /// `observed`
    async fn purge_if_unchanged(&self, key: &CacheKey, observed: DateTime<Utc>) {
        let _guard = self.lock.write().await;
        let current = match &self.disk {
            Some(disk) => disk.stat_timestamp(key).await,
            None => None,
        };
        if current != Some(observed) {
            debug!(key = %key, "Cache entry changed since lookup, keeping it");
            return;
        }
        self.memory.remove(key);
        self.delete_quietly(key).await;
    }

    async fn delete_quietly(&self, key: &CacheKey) {
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.delete(key).await {
                warn!(key = %key, error = %e, "Failed to delete cache file");
            }
        }
    }
}

async fn encode(image: Arc<Image>) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || image.encode_png())
        .await
        .map_err(|e| CacheError::Encode(e.to_string()))?
}

/// Read and decode a disk entry
async fn load_from_disk(disk: &DiskStore, key: &CacheKey) -> Result<Arc<Image>> {
    let bytes = disk.read(key).await?;
    let image = tokio::task::spawn_blocking(move || Image::decode(&bytes))
        .await
        .ok()
        .flatten()
        .ok_or(CacheError::CorruptEntry)?;
    Ok(Arc::new(image))
}
