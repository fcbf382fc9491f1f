//! Cache types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_EXPIRATION_SECS: u64 = 7 * 24 * 60 * 60; // 1 week
pub const DEFAULT_COUNT_LIMIT: usize = 200;
pub const DEFAULT_COST_LIMIT: u64 = 200 * 1024 * 1024; // 200MB

/// Configuration for an [`ImageCache`](crate::ImageCache)
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding one file per cached image
    pub cache_dir: PathBuf,
    /// Maximum age of a disk entry before it is treated as stale
    pub expiration_secs: u64,
    /// Maximum number of decoded images kept in memory
    pub count_limit: usize,
    /// Maximum aggregate cost (decoded bytes) kept in memory
    pub cost_limit: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("ImageCache"),
            expiration_secs: DEFAULT_EXPIRATION_SECS,
            count_limit: DEFAULT_COUNT_LIMIT,
            cost_limit: DEFAULT_COST_LIMIT,
        }
    }
}

impl CacheConfig {
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub memory_cost: u64,
    /// Memory entries dropped to stay within the count and cost limits
    pub evictions: u64,
    pub disk_entries: usize,
    pub disk_size: u64,
    pub hits: u64,
    pub misses: u64,
}
