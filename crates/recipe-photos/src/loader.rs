//! Cache-first photo loading with observable state
//!
//! An [`ImageLoader`] is bound to one photo URL. Each [`ImageLoader::load`]
//! walks `Idle -> Loading -> Succeeded | Failed`, publishing every transition
//! on a watch channel for whatever presents the photo.

use crate::error::LoadError;
use crate::fetcher::ByteFetcher;
use recipe_image_cache::{Image, ImageCache};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Observable state of a photo load
#[derive(Debug, Clone)]
pub enum LoadState {
    Idle,
    Loading,
    Succeeded(Arc<Image>),
    Failed(LoadError),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn image(&self) -> Option<&Arc<Image>> {
        match self {
            LoadState::Succeeded(image) => Some(image),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Loads one photo, consulting the cache before the network
pub struct ImageLoader {
    url: Option<String>,
    cache: Arc<ImageCache>,
    fetcher: Arc<dyn ByteFetcher>,
    state: watch::Sender<LoadState>,
}

impl ImageLoader {
    pub fn new(url: Option<String>, cache: Arc<ImageCache>, fetcher: Arc<dyn ByteFetcher>) -> Self {
        let (state, _) = watch::channel(LoadState::Idle);
        Self {
            url,
            cache,
            fetcher,
            state,
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Receive every subsequent state transition
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    /// Run one load and return the final state. Without a URL the loader
    /// stays idle.
    pub async fn load(&self) -> LoadState {
        let Some(url) = self.url.as_deref() else {
            return self.state();
        };

        self.state.send_replace(LoadState::Loading);

        let next = match self.resolve(url).await {
            Ok(image) => LoadState::Succeeded(image),
            Err(e) => {
                warn!(url = %url, error = %e, "Load failed");
                LoadState::Failed(e)
            }
        };

        self.state.send_replace(next.clone());
        next
    }

    async fn resolve(&self, url: &str) -> Result<Arc<Image>, LoadError> {
        if let Some(image) = self.cache.cached_image(url).await {
            debug!(url = %url, "Image loaded from cache");
            return Ok(image);
        }

        let bytes = self.fetcher.fetch(url).await?;

        let image = tokio::task::spawn_blocking(move || Image::decode(&bytes))
            .await
            .ok()
            .flatten()
            .ok_or(LoadError::InvalidData)?;
        let image = Arc::new(image);

        // Continue even if caching fails
        if let Err(e) = self.cache.cache_image(image.clone(), url).await {
            warn!(url = %url, error = %e, "Failed to cache image");
        }

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NetworkError, Result};
    use async_trait::async_trait;
    use image::{DynamicImage, Rgba, RgbaImage};
    use recipe_image_cache::CacheConfig;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;
    use tokio::sync::Notify;

    const TEST_URL: &str = "https://example.com/test-image.png";

    fn valid_image_data() -> Vec<u8> {
        let buf = RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8, y as u8, 42, 255]));
        Image::new(DynamicImage::ImageRgba8(buf)).encode_png().unwrap()
    }

    /// Replays queued responses and counts requests
    struct MockFetcher {
        responses: Mutex<VecDeque<Result<Vec<u8>>>>,
        requests: AtomicUsize,
    }

    impl MockFetcher {
        fn new(responses: Vec<Result<Vec<u8>>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: AtomicUsize::new(0),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ByteFetcher for MockFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(NetworkError::InvalidResponse))
        }
    }

    /// Blocks until released, so tests can observe the Loading state
    struct GatedFetcher {
        gate: Notify,
    }

    #[async_trait]
    impl ByteFetcher for GatedFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.gate.notified().await;
            Ok(valid_image_data())
        }
    }

    async fn create_test_cache(dir: &Path) -> Arc<ImageCache> {
        Arc::new(ImageCache::new(CacheConfig::with_cache_dir(dir)).await)
    }

    #[tokio::test]
    async fn test_no_url_stays_idle() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::new(vec![Ok(valid_image_data())]);
        let loader = ImageLoader::new(None, create_test_cache(dir.path()).await, fetcher.clone());

        let state = loader.load().await;
        assert!(matches!(state, LoadState::Idle));
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test]
    async fn test_network_fetch_happens_when_cache_misses() {
        let dir = tempdir().unwrap();
        let cache = create_test_cache(dir.path()).await;
        let fetcher = MockFetcher::new(vec![Ok(valid_image_data())]);
        let loader = ImageLoader::new(Some(TEST_URL.to_string()), cache.clone(), fetcher.clone());

        let state = loader.load().await;
        assert_eq!(fetcher.request_count(), 1);
        assert!(state.image().is_some());
        assert!(loader.state().image().is_some());

        // The fetched photo was stored
        assert!(cache.cached_image(TEST_URL).await.is_some());
    }

    #[tokio::test]
    async fn test_succeeds_when_disk_cache_write_fails() {
        let dir = tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let cache = create_test_cache(&cache_dir).await;
        std::fs::remove_dir_all(&cache_dir).unwrap();

        let fetcher = MockFetcher::new(vec![Ok(valid_image_data())]);
        let loader = ImageLoader::new(Some(TEST_URL.to_string()), cache.clone(), fetcher);

        let state = loader.load().await;
        assert!(matches!(state, LoadState::Succeeded(_)));
        // Still served from memory
        assert!(cache.cached_image(TEST_URL).await.is_some());
    }

    #[tokio::test]
    async fn test_network_fetch_skipped_when_cache_hits() {
        let dir = tempdir().unwrap();
        let cache = create_test_cache(dir.path()).await;
        let image = Arc::new(Image::decode(&valid_image_data()).unwrap());
        cache.cache_image(image.clone(), TEST_URL).await.unwrap();

        let fetcher = MockFetcher::new(vec![]);
        let loader = ImageLoader::new(Some(TEST_URL.to_string()), cache, fetcher.clone());

        let state = loader.load().await;
        assert_eq!(fetcher.request_count(), 0);
        assert_eq!(**state.image().unwrap(), *image);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported_and_not_cached() {
        let dir = tempdir().unwrap();
        let cache = create_test_cache(dir.path()).await;
        let fetcher = MockFetcher::new(vec![Err(NetworkError::BadStatus(404))]);
        let loader = ImageLoader::new(Some(TEST_URL.to_string()), cache.clone(), fetcher);

        let state = loader.load().await;
        assert_eq!(
            state.error(),
            Some(&LoadError::Network(NetworkError::BadStatus(404)))
        );
        assert!(cache.cached_image(TEST_URL).await.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_bytes_fail_with_invalid_data() {
        let dir = tempdir().unwrap();
        let cache = create_test_cache(dir.path()).await;
        let fetcher = MockFetcher::new(vec![Ok(b"<html>not an image</html>".to_vec())]);
        let loader = ImageLoader::new(Some(TEST_URL.to_string()), cache.clone(), fetcher);

        let state = loader.load().await;
        assert_eq!(state.error(), Some(&LoadError::InvalidData));
        assert!(cache.cached_image(TEST_URL).await.is_none());
    }

    #[tokio::test]
    async fn test_retry_after_failure_clears_error() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::new(vec![
            Err(NetworkError::Transport("connection reset".to_string())),
            Ok(valid_image_data()),
        ]);
        let loader = ImageLoader::new(
            Some(TEST_URL.to_string()),
            create_test_cache(dir.path()).await,
            fetcher.clone(),
        );

        assert!(loader.load().await.error().is_some());
        let state = loader.load().await;
        assert!(state.error().is_none());
        assert!(state.image().is_some());
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_state_transitions_are_published() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(GatedFetcher {
            gate: Notify::new(),
        });
        let loader = Arc::new(ImageLoader::new(
            Some(TEST_URL.to_string()),
            create_test_cache(dir.path()).await,
            fetcher.clone(),
        ));
        let mut rx = loader.subscribe();
        assert!(matches!(*rx.borrow(), LoadState::Idle));

        let task = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load().await }
        });

        rx.wait_for(|state| state.is_loading()).await.unwrap();
        fetcher.gate.notify_one();

        let state = rx
            .wait_for(|state| state.image().is_some())
            .await
            .unwrap()
            .clone();
        assert!(state.image().is_some());
        assert!(task.await.unwrap().image().is_some());
    }

    #[tokio::test]
    async fn test_dropping_loader_mid_flight_releases_cache() {
        let dir = tempdir().unwrap();
        let cache = create_test_cache(dir.path()).await;
        let fetcher = Arc::new(GatedFetcher {
            gate: Notify::new(),
        });
        let loader = Arc::new(ImageLoader::new(
            Some(TEST_URL.to_string()),
            cache.clone(),
            fetcher,
        ));

        let mut rx = loader.subscribe();
        let task = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load().await }
        });
        rx.wait_for(|state| state.is_loading()).await.unwrap();

        task.abort();
        let _ = task.await;
        drop(rx);
        drop(loader);

        assert_eq!(Arc::strong_count(&cache), 1);
        cache.clear_cache().await.unwrap();
    }
}
