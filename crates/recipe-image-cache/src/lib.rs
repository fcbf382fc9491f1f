//! Two-tier image cache with TTL expiration and LRU eviction
//!
//! Decoded images live in a bounded in-memory index; their encoded bytes are
//! persisted to a cache directory, one file per key. The file modification
//! time is the single source of truth for freshness, so expiration survives
//! process restarts.

pub mod cache;
pub mod disk;
pub mod error;
pub mod key;
pub mod memory;
pub mod photo;
pub mod types;

pub use cache::ImageCache;
pub use disk::DiskStore;
pub use error::{CacheError, Result};
pub use key::CacheKey;
pub use memory::MemoryStore;
pub use photo::Image;
pub use types::{CacheConfig, CacheStats};
