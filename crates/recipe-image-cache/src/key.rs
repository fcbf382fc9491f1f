//! Cache key derivation

use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256 digest of a source identifier (usually a URL)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Length of a key in hex characters
    pub const LEN: usize = 64;

    /// Derive the key for a source identifier
    pub fn derive(source: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        CacheKey(hex::encode(hasher.finalize()))
    }

    /// Recover a key from a cache file name. Returns `None` for anything that
    /// is not a well-formed digest (temp files, stray files).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let valid = name.len() == Self::LEN
            && name
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| CacheKey(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHOTO_URL: &str = "https://d3jbb8n5wk0qxi.cloudfront.net/photos/b9ab0071-b281-4bee-b361-ec340d405320/large.jpg";

    #[test]
    fn test_cache_key_generation() {
        let key1 = CacheKey::derive(PHOTO_URL);
        let key2 = CacheKey::derive(PHOTO_URL);
        let key3 = CacheKey::derive("https://test.com/1.jpg");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);

        assert_eq!(key1.as_str().len(), CacheKey::LEN);
        assert!(key1.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_known_digest() {
        // sha256("")
        assert_eq!(
            CacheKey::derive("").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_from_file_name() {
        let key = CacheKey::derive(PHOTO_URL);
        assert_eq!(CacheKey::from_file_name(key.as_str()), Some(key.clone()));

        let tmp = format!("{}.tmp", key);
        assert!(CacheKey::from_file_name(&tmp).is_none());
        assert!(CacheKey::from_file_name(".DS_Store").is_none());
        assert!(CacheKey::from_file_name(&key.as_str().to_uppercase()).is_none());
    }
}
