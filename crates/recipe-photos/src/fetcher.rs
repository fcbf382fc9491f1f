//! Raw byte fetching over HTTP

use crate::error::{NetworkError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("recipe-photos/", env!("CARGO_PKG_VERSION"));

/// Anything that can turn a URL into response bytes
#[async_trait]
pub trait ByteFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// reqwest-backed [`ByteFetcher`]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ByteFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url).map_err(|_| NetworkError::InvalidUrl(url.to_string()))?;

        debug!(url = %parsed, "Fetching");
        let response = self.client.get(parsed).send().await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), url = %url, "Request failed");
            return Err(NetworkError::BadStatus(response.status().as_u16()));
        }

        let data = response.bytes().await?.to_vec();
        if data.is_empty() {
            return Err(NetworkError::InvalidResponse);
        }

        debug!(url = %url, size = data.len(), "Fetched");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_sending() {
        let fetcher = HttpFetcher::new(Duration::from_secs(1)).unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert_eq!(err, NetworkError::InvalidUrl("not a url".to_string()));
    }
}
