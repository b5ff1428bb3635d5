//! Orchestrator pipeline integration tests.
//!
//! These drive the orchestrator end to end with a mock fetcher and a mock
//! back tier: validation, caching, rate limiting, admission, degraded
//! enrichment and the background task lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{advance, Instant};

use pagescope_core::testing::{fixtures, MockBackend, MockFetcher};
use pagescope_core::{
    FetchError, PipelineError, ProcessingData, ProcessingStatus, ScrapeOrchestrator,
    ScraperConfig, TaskStatus,
};

/// Test helper holding the orchestrator and handles to its mocks.
struct TestHarness {
    orchestrator: Arc<ScrapeOrchestrator>,
    fetcher: Arc<MockFetcher>,
    backend: Arc<MockBackend>,
}

impl TestHarness {
    fn new(config: ScraperConfig, fetcher: MockFetcher, backend: MockBackend) -> Self {
        let fetcher = Arc::new(fetcher);
        let backend = Arc::new(backend);
        let orchestrator = Arc::new(ScrapeOrchestrator::new(
            &config,
            fetcher.clone(),
            backend.clone(),
        ));
        Self {
            orchestrator,
            fetcher,
            backend,
        }
    }

    fn with_pages(config: ScraperConfig, urls: &[&str]) -> Self {
        let fetcher = urls.iter().fold(MockFetcher::new(), |fetcher, url| {
            fetcher.with_page(url, fixtures::html_page("Example"))
        });
        Self::new(config, fetcher, MockBackend::new())
    }

    /// Poll a task until it reaches a terminal status, checking that status
    /// never moves backwards.
    async fn wait_for_task(&self, id: &str) -> TaskStatus {
        let mut last = TaskStatus::Pending;
        for _ in 0..500 {
            let record = self
                .orchestrator
                .task_status(id)
                .await
                .expect("task should exist");
            assert!(
                record.status >= last,
                "status went backwards: {} -> {}",
                last,
                record.status
            );
            last = record.status;
            if last.is_terminal() {
                return last;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} did not finish, last status {}", id, last);
    }
}

fn config() -> ScraperConfig {
    ScraperConfig {
        workers: 2,
        rate_limit_per_minute: 60,
        cache_ttl_secs: 3600,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_invalid_urls_are_rejected_without_fetching() {
    let harness = TestHarness::with_pages(config(), &[]);

    for url in ["", "example.com", "ftp://example.com/", "http://"] {
        let err = harness.orchestrator.run_pipeline(url).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidUrl(_)), "{url:?}");

        let err = harness.orchestrator.create_task(url).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidUrl(_)), "{url:?}");
    }

    assert_eq!(harness.fetcher.call_count(), 0);
    let status = harness.orchestrator.status().await;
    assert_eq!(status.tasks.pending, 0);
    assert_eq!(status.tracked_domains, 0);
}

#[tokio::test]
async fn test_successful_pipeline_result() {
    let harness = TestHarness::with_pages(config(), &["https://example.com/"]);

    let result = harness
        .orchestrator
        .run_pipeline("https://example.com/")
        .await
        .unwrap();

    assert_eq!(result.url, "https://example.com/");
    assert_eq!(result.status, "success");
    assert_eq!(result.processing_status, ProcessingStatus::Success);
    assert_eq!(result.processing_data, fixtures::processing_data());
    assert_eq!(result.scraping_data.title, "Example");
    assert_eq!(result.scraping_data.header_count(1), 1);
    assert!(result
        .scraping_data
        .links
        .contains(&"https://example.com/about".to_string()));
    assert!(result.timestamp.ends_with('Z'));
    assert!(chrono::DateTime::parse_from_rfc3339(&result.timestamp).is_ok());

    let requests = harness.backend.recorded_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].action, "process_page");
    assert_eq!(requests[0].scraping_data, result.scraping_data);
    assert!(requests[0].html.contains("<h1>Example</h1>"));
}

#[tokio::test]
async fn test_redirect_uses_final_url() {
    let fetcher = MockFetcher::new();
    fetcher
        .set_redirect(
            "http://example.com/",
            "https://www.example.com/home/",
            fixtures::html_page("Home"),
        )
        .await;
    let harness = TestHarness::new(config(), fetcher, MockBackend::new());

    let result = harness
        .orchestrator
        .run_pipeline("http://example.com/")
        .await
        .unwrap();

    assert_eq!(result.url, "https://www.example.com/home/");
    assert!(result
        .scraping_data
        .images
        .contains(&"https://www.example.com/logo.png".to_string()));
    assert_eq!(
        harness.backend.recorded_requests().await[0].url,
        "https://www.example.com/home/"
    );
}

#[tokio::test(start_paused = true)]
async fn test_cache_serves_repeat_requests_until_ttl() {
    let harness = TestHarness::with_pages(
        ScraperConfig {
            cache_ttl_secs: 30,
            ..config()
        },
        &["https://example.com/"],
    );

    let first = harness
        .orchestrator
        .run_pipeline("https://example.com/")
        .await
        .unwrap();
    let second = harness
        .orchestrator
        .run_pipeline("https://example.com/")
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(harness.fetcher.call_count(), 1);

    advance(Duration::from_secs(31)).await;
    harness
        .orchestrator
        .run_pipeline("https://example.com/")
        .await
        .unwrap();
    assert_eq!(harness.fetcher.call_count(), 2);
}

#[tokio::test]
async fn test_cache_disabled_with_zero_ttl() {
    let harness = TestHarness::with_pages(
        ScraperConfig {
            cache_ttl_secs: 0,
            ..config()
        },
        &["https://example.com/"],
    );

    for _ in 0..3 {
        harness
            .orchestrator
            .run_pipeline("https://example.com/")
            .await
            .unwrap();
    }
    assert_eq!(harness.fetcher.call_count(), 3);
    assert_eq!(harness.orchestrator.status().await.cache_entries, 0);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_per_domain_window() {
    let urls = [
        "https://example.com/1",
        "https://example.com/2",
        "https://example.com/3",
        "https://other.test/",
    ];
    let harness = TestHarness::with_pages(
        ScraperConfig {
            rate_limit_per_minute: 2,
            ..config()
        },
        &urls,
    );

    harness.orchestrator.run_pipeline(urls[0]).await.unwrap();
    harness.orchestrator.run_pipeline(urls[1]).await.unwrap();

    let err = harness.orchestrator.run_pipeline(urls[2]).await.unwrap_err();
    match err {
        PipelineError::RateLimitExceeded { domain, count } => {
            assert_eq!(domain, "example.com");
            assert_eq!(count, 2);
        }
        other => panic!("Expected RateLimitExceeded, got {other:?}"),
    }
    assert_eq!(harness.fetcher.call_count(), 2);

    // Other domains have their own window.
    harness.orchestrator.run_pipeline(urls[3]).await.unwrap();

    advance(Duration::from_secs(60)).await;
    harness.orchestrator.run_pipeline(urls[2]).await.unwrap();
    assert_eq!(harness.fetcher.call_count(), 4);
}

#[tokio::test]
async fn test_cached_results_bypass_rate_limit() {
    let urls = ["https://example.com/cached", "https://example.com/fresh"];
    let harness = TestHarness::with_pages(
        ScraperConfig {
            rate_limit_per_minute: 1,
            ..config()
        },
        &urls,
    );

    harness.orchestrator.run_pipeline(urls[0]).await.unwrap();
    assert!(matches!(
        harness.orchestrator.run_pipeline(urls[1]).await,
        Err(PipelineError::RateLimitExceeded { .. })
    ));

    // Window exhausted, yet the cached page is still served.
    for _ in 0..3 {
        harness.orchestrator.run_pipeline(urls[0]).await.unwrap();
    }
    assert_eq!(harness.fetcher.call_count(), 1);
}

#[tokio::test]
async fn test_unreachable_backend_degrades() {
    let harness = TestHarness::new(
        config(),
        MockFetcher::new().with_page("https://example.com/", fixtures::html_page("Example")),
        MockBackend::unavailable(),
    );

    let result = harness
        .orchestrator
        .run_pipeline("https://example.com/")
        .await
        .unwrap();

    assert_eq!(result.status, "success");
    assert_eq!(result.processing_status, ProcessingStatus::Failed);
    assert_eq!(result.processing_data, ProcessingData::placeholder());
    assert_eq!(result.scraping_data.title, "Example");

    let json = serde_json::to_value(&result).unwrap();
    for key in ["screenshot", "performance", "thumbnails", "advanced"] {
        assert!(json["processing_data"][key].is_null());
    }
}

#[tokio::test]
async fn test_backend_error_response_degrades() {
    let harness = TestHarness::with_pages(config(), &["https://example.com/"]);
    harness.backend.set_rejecting("worker crashed").await;

    let result = harness
        .orchestrator
        .run_pipeline("https://example.com/")
        .await
        .unwrap();
    assert!(result.is_degraded());
}

#[tokio::test]
async fn test_fetch_failure_propagates() {
    let harness = TestHarness::with_pages(config(), &["https://example.com/"]);
    harness
        .fetcher
        .fail_next(FetchError::TooLarge { limit_bytes: 10 })
        .await;

    let err = harness
        .orchestrator
        .run_pipeline("https://example.com/")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Fetch(FetchError::TooLarge { limit_bytes: 10 })
    ));
    assert!(harness.backend.recorded_requests().await.is_empty());

    // Failures are not cached.
    harness
        .orchestrator
        .run_pipeline("https://example.com/")
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_admission_gate_bounds_concurrency() {
    let urls = ["https://a.test/", "https://b.test/", "https://c.test/"];
    let fetcher = urls
        .iter()
        .fold(MockFetcher::new(), |f, url| f.with_page(url, "<p>x</p>"))
        .with_delay(Duration::from_secs(1));
    let harness = TestHarness::new(
        ScraperConfig {
            workers: 1,
            ..config()
        },
        fetcher,
        MockBackend::new(),
    );

    let started = Instant::now();
    let (a, b, c) = tokio::join!(
        harness.orchestrator.run_pipeline(urls[0]),
        harness.orchestrator.run_pipeline(urls[1]),
        harness.orchestrator.run_pipeline(urls[2]),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());

    // One slot: the three fetches ran one after another.
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(harness.orchestrator.status().await.available_slots, 1);
}

#[tokio::test(start_paused = true)]
async fn test_admission_gate_allows_parallel_runs() {
    let urls = ["https://a.test/", "https://b.test/", "https://c.test/"];
    let fetcher = urls
        .iter()
        .fold(MockFetcher::new(), |f, url| f.with_page(url, "<p>x</p>"))
        .with_delay(Duration::from_secs(1));
    let harness = TestHarness::new(
        ScraperConfig {
            workers: 3,
            ..config()
        },
        fetcher,
        MockBackend::new(),
    );

    let started = Instant::now();
    let _ = tokio::join!(
        harness.orchestrator.run_pipeline(urls[0]),
        harness.orchestrator.run_pipeline(urls[1]),
        harness.orchestrator.run_pipeline(urls[2]),
    );
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_task_lifecycle_completes() {
    let harness = TestHarness::with_pages(config(), &["https://example.com/"]);

    let id = harness
        .orchestrator
        .create_task("https://example.com/")
        .await
        .unwrap();

    let created = harness.orchestrator.task_status(&id).await.unwrap();
    assert_eq!(created.url, "https://example.com/");

    assert_eq!(harness.wait_for_task(&id).await, TaskStatus::Completed);

    let record = harness.orchestrator.task_result(&id).await.unwrap();
    let result = record.result.expect("completed task has a result");
    assert_eq!(result.scraping_data.title, "Example");
    assert!(record.error.is_none());
}

#[tokio::test]
async fn test_task_passes_through_processing() {
    let harness = TestHarness::with_pages(config(), &["https://example.com/"]);
    harness
        .backend
        .set_delay(Some(Duration::from_millis(300)))
        .await;

    let id = harness
        .orchestrator
        .create_task("https://example.com/")
        .await
        .unwrap();

    let mut seen_processing = false;
    for _ in 0..100 {
        let status = harness.orchestrator.task_status(&id).await.unwrap().status;
        if status == TaskStatus::Processing {
            seen_processing = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(seen_processing);
    assert_eq!(harness.wait_for_task(&id).await, TaskStatus::Completed);
}

#[tokio::test]
async fn test_task_fails_on_fetch_error() {
    let harness = TestHarness::with_pages(config(), &[]);

    let id = harness
        .orchestrator
        .create_task("https://missing.test/")
        .await
        .unwrap();

    assert_eq!(harness.wait_for_task(&id).await, TaskStatus::Failed);
    let record = harness.orchestrator.task_result(&id).await.unwrap();
    assert!(record.result.is_none());
    assert!(record.error.unwrap().contains("404"));
}

#[tokio::test]
async fn test_task_fails_when_rate_limited() {
    let harness = TestHarness::with_pages(
        ScraperConfig {
            rate_limit_per_minute: 1,
            ..config()
        },
        &["https://example.com/a", "https://example.com/b"],
    );

    harness
        .orchestrator
        .run_pipeline("https://example.com/a")
        .await
        .unwrap();
    let id = harness
        .orchestrator
        .create_task("https://example.com/b")
        .await
        .unwrap();

    assert_eq!(harness.wait_for_task(&id).await, TaskStatus::Failed);
    let error = harness.orchestrator.task_status(&id).await.unwrap().error;
    assert!(error.unwrap().contains("rate limit"));
}

#[tokio::test]
async fn test_task_completes_from_cache() {
    let harness = TestHarness::with_pages(config(), &["https://example.com/"]);
    harness
        .orchestrator
        .run_pipeline("https://example.com/")
        .await
        .unwrap();

    let id = harness
        .orchestrator
        .create_task("https://example.com/")
        .await
        .unwrap();
    assert_eq!(harness.wait_for_task(&id).await, TaskStatus::Completed);
    assert_eq!(harness.fetcher.call_count(), 1);
}

#[tokio::test]
async fn test_status_reports_counts() {
    let harness = TestHarness::with_pages(config(), &["https://example.com/"]);

    let ok = harness
        .orchestrator
        .create_task("https://example.com/")
        .await
        .unwrap();
    let bad = harness
        .orchestrator
        .create_task("https://missing.test/")
        .await
        .unwrap();
    harness.wait_for_task(&ok).await;
    harness.wait_for_task(&bad).await;

    let status = harness.orchestrator.status().await;
    assert_eq!(status.workers, 2);
    assert_eq!(status.available_slots, 2);
    assert_eq!(status.cache_entries, 1);
    assert_eq!(status.tracked_domains, 2);
    assert_eq!(status.tasks.completed, 1);
    assert_eq!(status.tasks.failed, 1);
}

#[tokio::test]
async fn test_unknown_task() {
    let harness = TestHarness::with_pages(config(), &[]);
    assert!(harness.orchestrator.task_status("nope").await.is_none());
    assert!(harness.orchestrator.task_result("nope").await.is_none());
}
