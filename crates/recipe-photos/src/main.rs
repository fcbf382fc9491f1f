//! Recipe photos - fetches the recipe list and warms the photo cache
//!
//! Loads every recipe's thumbnail through the two-tier image cache, so a
//! second run is served entirely from memory or disk.

use futures::stream::{self, StreamExt};
use recipe_image_cache::ImageCache;
use recipe_photos::{
    AppConfig, AppError, ByteFetcher, HttpFetcher, ImageLoader, LoadState, RecipeClient,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("recipe_photos=info".parse()?)
        .add_directive("recipe_image_cache=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    let config = AppConfig::from_env();
    info!("Recipes URL: {}", config.recipes_url);
    info!("Cache dir: {:?}", config.cache.cache_dir);

    let cache = Arc::new(ImageCache::new(config.cache.clone()).await);
    info!(
        "Memory limits: {} images, {} MB",
        cache.count_limit(),
        cache.cost_limit() / (1024 * 1024)
    );
    info!("Cache TTL: {} seconds", cache.expiration_secs());

    if std::env::args().skip(1).any(|arg| arg == "--clear") {
        cache.clear_cache().await?;
        info!("Cleared image cache");
    }

    let purged = cache.purge_expired().await?;
    if purged > 0 {
        info!(purged, "Removed expired photos");
    }

    let fetcher: Arc<dyn ByteFetcher> = Arc::new(HttpFetcher::new(config.http_timeout)?);
    let recipes = RecipeClient::new(fetcher.clone())
        .fetch_recipes(&config.recipes_url)
        .await?;

    if recipes.is_empty() {
        info!("No recipes available");
        return Ok(());
    }

    let outcomes: Vec<_> = stream::iter(recipes.iter().cloned())
        .map(|recipe| {
            let loader = ImageLoader::new(
                recipe.thumbnail_url().map(str::to_string),
                cache.clone(),
                fetcher.clone(),
            );
            async move {
                let state = loader.load().await;
                (recipe, state)
            }
        })
        .buffer_unordered(config.fetch_concurrency)
        .collect()
        .await;

    let mut loaded = 0usize;
    let mut failed = 0usize;
    for (recipe, state) in &outcomes {
        match state {
            LoadState::Succeeded(image) => {
                loaded += 1;
                info!(
                    recipe = %recipe.name,
                    cuisine = recipe.cuisine.as_deref().unwrap_or("unknown"),
                    width = image.width(),
                    height = image.height(),
                    "Photo ready"
                );
            }
            LoadState::Failed(e) => {
                failed += 1;
                warn!(recipe = %recipe.name, error = %e, "Photo unavailable");
            }
            LoadState::Idle => {
                warn!(recipe = %recipe.name, "Recipe has no photo");
            }
            LoadState::Loading => unreachable!("load() returns a settled state"),
        }
    }

    let stats = cache.stats().await;
    info!(
        recipes = recipes.len(),
        loaded,
        failed,
        hits = stats.hits,
        misses = stats.misses,
        memory_entries = stats.memory_entries,
        evictions = stats.evictions,
        disk_entries = stats.disk_entries,
        disk_size = stats.disk_size,
        "Finished loading photos"
    );

    Ok(())
}
