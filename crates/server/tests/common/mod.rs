//! Common test utilities for in-process API testing with mocks.
//!
//! This module provides a test fixture that builds the router over a real
//! orchestrator whose fetcher and back tier are mocks, so endpoints can be
//! exercised without network access or a running processor.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use pagescope_core::testing::{MockBackend, MockFetcher};
use pagescope_core::{Config, ScrapeOrchestrator, ScraperConfig};

/// Re-export fixtures for test convenience
pub use pagescope_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_scrape() {
///     let fixture = TestFixture::new().await;
///     fixture.fetcher.set_page("https://example.com/", fixtures::html_page("Home")).await;
///
///     let response = fixture.get("/scrape?url=https://example.com/").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock fetcher - configure pages and failures
    pub fetcher: Arc<MockFetcher>,
    /// Mock back tier - configure processing data or unavailability
    pub backend: Arc<MockBackend>,
    pub orchestrator: Arc<ScrapeOrchestrator>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with default scraper settings.
    pub async fn new() -> Self {
        Self::with_scraper(ScraperConfig::default()).await
    }

    /// Create a test fixture with custom scraper settings.
    pub async fn with_scraper(scraper: ScraperConfig) -> Self {
        let fetcher = Arc::new(MockFetcher::new());
        let backend = Arc::new(MockBackend::new());

        let config = Config {
            scraper,
            ..Default::default()
        };

        let orchestrator = Arc::new(ScrapeOrchestrator::new(
            &config.scraper,
            Arc::clone(&fetcher) as Arc<dyn pagescope_core::PageFetcher>,
            Arc::clone(&backend) as Arc<dyn pagescope_core::ProcessingBackend>,
        ));

        let state = Arc::new(pagescope_server::state::AppState::new(
            config,
            Arc::clone(&orchestrator),
        ));
        let router = pagescope_server::api::create_router(state);

        Self {
            router,
            fetcher,
            backend,
            orchestrator,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body.to_string())).await
    }

    /// Send a POST request with a raw body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request("POST", path, Some(body.to_string())).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<String>) -> TestResponse {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }

    /// Poll `/status/{id}` until the task reaches a terminal status.
    pub async fn wait_for_task(&self, task_id: &str) -> TestResponse {
        for _ in 0..200 {
            let response = self.get(&format!("/status/{}", task_id)).await;
            let status = response.body["status"].as_str().unwrap_or_default();
            if status == "completed" || status == "failed" {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} did not finish in time", task_id);
    }
}
