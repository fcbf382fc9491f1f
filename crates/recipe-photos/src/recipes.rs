//! Recipe list client

use crate::error::{NetworkError, Result};
use crate::fetcher::ByteFetcher;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const BASE_URL: &str = "https://d3jbb8n5wk0qxi.cloudfront.net";
const LIST_CACHE_TTL_SECS: u64 = 300; // 5 minutes

/// Well-known recipe list endpoints
pub mod endpoints {
    use super::BASE_URL;

    pub fn recipes() -> String {
        format!("{}/recipes.json", BASE_URL)
    }

    pub fn malformed_recipes() -> String {
        format!("{}/recipes-malformed.json", BASE_URL)
    }

    pub fn empty_recipes() -> String {
        format!("{}/recipes-empty.json", BASE_URL)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub uuid: String,
    pub name: String,
    pub cuisine: Option<String>,
    pub photo_url_large: Option<String>,
    pub photo_url_small: Option<String>,
    pub source_url: Option<String>,
    pub youtube_url: Option<String>,
}

impl Recipe {
    /// Preferred photo for list rows: small, falling back to large
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.photo_url_small
            .as_deref()
            .or(self.photo_url_large.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct RecipeResponse {
    recipes: Vec<Recipe>,
}

/// Fetches and validates recipe lists, caching parsed results briefly
pub struct RecipeClient {
    fetcher: Arc<dyn ByteFetcher>,
    cache: Cache<String, Arc<Vec<Recipe>>>,
}

impl RecipeClient {
    pub fn new(fetcher: Arc<dyn ByteFetcher>) -> Self {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(LIST_CACHE_TTL_SECS))
            .build();

        Self { fetcher, cache }
    }

    /// Fetch the recipe list at `url`
    pub async fn fetch_recipes(&self, url: &str) -> Result<Arc<Vec<Recipe>>> {
        if let Some(cached) = self.cache.get(url).await {
            debug!(url = %url, count = cached.len(), "Recipe list cache hit");
            return Ok(cached);
        }

        let data = self.fetcher.fetch(url).await?;
        let recipes = Arc::new(parse_recipes(&data)?);
        info!(url = %url, count = recipes.len(), "Fetched recipes");

        self.cache.insert(url.to_string(), recipes.clone()).await;
        Ok(recipes)
    }
}

/// Decode and validate a recipe list response body
pub fn parse_recipes(data: &[u8]) -> Result<Vec<Recipe>> {
    let response: RecipeResponse = serde_json::from_slice(data).map_err(|e| match e.classify() {
        // Missing keys, wrong types, nulls in required fields
        Category::Data => NetworkError::MalformedData,
        _ => NetworkError::Decoding(e.to_string()),
    })?;

    if let Some(bad) = response
        .recipes
        .iter()
        .find(|r| r.name.is_empty() || r.cuisine.is_none())
    {
        warn!(uuid = %bad.uuid, "Recipe is missing required fields");
        return Err(NetworkError::MalformedData);
    }

    Ok(response.recipes)
}
