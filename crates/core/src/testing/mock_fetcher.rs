//! Mock page fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::page::{FetchError, FetchedPage, PageFetcher};

/// Mock implementation of the PageFetcher trait.
///
/// Provides controllable behavior for testing:
/// - Serve canned pages per URL (optionally with a redirect target)
/// - Count and record fetches for assertions
/// - Simulate failures and slow responses
///
/// Unknown URLs fail with HTTP 404.
///
/// # Example
///
/// ```rust,ignore
/// use pagescope_core::testing::{fixtures, MockFetcher};
///
/// let fetcher = MockFetcher::new().with_page("https://example.com/", fixtures::html_page("Home"));
/// let page = fetcher.fetch("https://example.com/").await?;
/// assert_eq!(fetcher.call_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockFetcher {
    pages: RwLock<HashMap<String, FetchedPage>>,
    /// Errors returned for specific URLs on every fetch.
    failures: RwLock<HashMap<String, FetchError>>,
    /// If set, the next fetch fails with this error.
    next_error: RwLock<Option<FetchError>>,
    delay: RwLock<Option<Duration>>,
    fetched: RwLock<Vec<String>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: serve `html` for `url` with no redirect.
    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.get_mut().insert(
            url.to_string(),
            FetchedPage {
                body: html.into(),
                final_url: url.to_string(),
            },
        );
        self
    }

    /// Builder: add a delay before every response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        *self.delay.get_mut() = Some(delay);
        self
    }

    pub async fn set_page(&self, url: &str, html: impl Into<String>) {
        self.set_redirect(url, url, html).await;
    }

    /// Serve `html` for `url` as if redirected to `final_url`.
    pub async fn set_redirect(&self, url: &str, final_url: &str, html: impl Into<String>) {
        self.pages.write().await.insert(
            url.to_string(),
            FetchedPage {
                body: html.into(),
                final_url: final_url.to_string(),
            },
        );
    }

    /// Fail every fetch of `url` with `error`.
    pub async fn fail_url(&self, url: &str, error: FetchError) {
        self.failures.write().await.insert(url.to_string(), error);
    }

    /// Make the next fetch (of any URL) fail.
    pub async fn fail_next(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().await = delay;
    }

    /// Number of fetch calls, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs fetched so far, in call order.
    pub async fn fetched_urls(&self) -> Vec<String> {
        self.fetched.read().await.clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fetched.write().await.push(url.to_string());

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if let Some(err) = self.failures.read().await.get(url) {
            return Err(err.clone());
        }

        self.pages
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}
