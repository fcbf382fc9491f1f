//! Recipe photos
//!
//! Fetches the recipe list and loads each recipe's photo through a shared
//! two-tier [`ImageCache`](recipe_image_cache::ImageCache), going to the
//! network only on a cache miss.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod recipes;

pub use config::AppConfig;
pub use error::{AppError, LoadError, NetworkError, Result};
pub use fetcher::{ByteFetcher, HttpFetcher};
pub use loader::{ImageLoader, LoadState};
pub use recipes::{Recipe, RecipeClient};
