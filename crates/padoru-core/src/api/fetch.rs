//! Download primitives used for remote collection documents and images.

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, Url};
use tracing::debug;

use crate::error::{PadoruError, Result};

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Source of remote text and bytes.
///
/// Implementations surface failures as errors and never retry; callers
/// decide what to do with a failed download.
pub trait Fetcher: Send + Sync {
    fn fetch_text<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<String>>;

    fn fetch_bytes<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// `Fetcher` backed by a pooled reqwest client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            Err(PadoruError::from_status(&url, status, &body))
        }
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        debug!(url = %url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        Self::check_response(response).await
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<String>> {
        async move { Ok(self.get(url).await?.text().await?) }.boxed()
    }

    fn fetch_bytes<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>>> {
        async move { Ok(self.get(url).await?.bytes().await?.to_vec()) }.boxed()
    }
}
