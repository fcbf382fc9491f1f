use crate::recipes::endpoints;
use recipe_image_cache::types::{DEFAULT_COST_LIMIT, DEFAULT_COUNT_LIMIT, DEFAULT_EXPIRATION_SECS};
use recipe_image_cache::CacheConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub recipes_url: String,
    pub cache: CacheConfig,
    pub fetch_concurrency: usize,
    pub http_timeout: Duration,
}

impl AppConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            name: &str,
        ) -> Option<T> {
            lookup(name).and_then(|s| s.parse().ok())
        }

        let recipes_url = lookup("RECIPES_URL").unwrap_or_else(endpoints::recipes);

        let cache_dir = lookup("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./cache/ImageCache"));

        let cache = CacheConfig {
            cache_dir,
            expiration_secs: parsed(&lookup, "CACHE_TTL_SECS").unwrap_or(DEFAULT_EXPIRATION_SECS),
            count_limit: parsed(&lookup, "CACHE_COUNT_LIMIT").unwrap_or(DEFAULT_COUNT_LIMIT),
            cost_limit: parsed(&lookup, "CACHE_COST_LIMIT").unwrap_or(DEFAULT_COST_LIMIT),
        };

        let fetch_concurrency = parsed(&lookup, "FETCH_CONCURRENCY")
            .filter(|n: &usize| *n > 0)
            .unwrap_or(8);

        let http_timeout =
            Duration::from_secs(parsed(&lookup, "HTTP_TIMEOUT_SECS").unwrap_or(30));

        Self {
            recipes_url,
            cache,
            fetch_concurrency,
            http_timeout,
        }
    }
}
