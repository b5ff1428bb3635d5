//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the orchestrator's
//! collaborator traits, allowing pipeline tests without network access or a
//! running back tier.
//!
//! # Example
//!
//! ```rust,ignore
//! use pagescope_core::testing::{fixtures, MockBackend, MockFetcher};
//!
//! let fetcher = Arc::new(MockFetcher::new().with_page("https://example.com/", fixtures::html_page("Home")));
//! let backend = Arc::new(MockBackend::unavailable());
//! let orchestrator = ScrapeOrchestrator::new(&ScraperConfig::default(), fetcher, backend);
//! ```

mod mock_backend;
mod mock_fetcher;

pub use mock_backend::MockBackend;
pub use mock_fetcher::MockFetcher;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::analysis::{PerformanceMetrics, ProcessingData};

    /// A small but complete HTML page.
    pub fn html_page(title: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
  <title>{title}</title>
  <meta name="description" content="About {title}">
  <meta property="og:title" content="{title}">
</head>
<body>
  <h1>{title}</h1>
  <h2>Section</h2>
  <a href="/about">About</a>
  <a href="https://other.test/">Elsewhere</a>
  <img src="/logo.png" alt="Logo">
</body>
</html>"#
        )
    }

    /// Recognisable processing data, distinct from the placeholder.
    pub fn processing_data() -> ProcessingData {
        ProcessingData {
            screenshot: Some("c2NyZWVuc2hvdA==".to_string()),
            performance: Some(PerformanceMetrics {
                load_time_ms: Some(120),
                total_size_kb: Some(4.5),
                num_requests: 1,
            }),
            thumbnails: Some(vec![]),
            advanced: None,
        }
    }
}
