//! Enrichment analyzers run by back-tier workers.
//!
//! Every analyzer is a blocking, self-contained function of the page URL,
//! its extracted record and its body. They perform network and CPU work and
//! must only be called from a worker process, never from an async runtime.

mod advanced;
mod performance;
mod screenshot;
mod thumbnails;
mod types;

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::page::ScrapingData;

pub use advanced::analyze as analyze_advanced;
pub use performance::measure as measure_performance;
pub use screenshot::{
    capture as capture_screenshot, SCREENSHOT_HEIGHT, SCREENSHOT_TIMEOUT, SCREENSHOT_WIDTH,
};
pub use thumbnails::{generate as generate_thumbnails, thumbnail_png, MAX_THUMBNAILS, THUMBNAIL_SIZE};
pub use types::{
    Accessibility, AdvancedAnalysis, PerformanceMetrics, ProcessingData, SeoReport,
    StructuredData, Technologies,
};

/// Environment variable through which the dispatcher hands the browser path
/// to its workers.
pub const SCREENSHOT_BROWSER_ENV: &str = "PAGESCOPE_WORKER_BROWSER";

/// Knobs for the analyzers.
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    pub screenshot_browser: Option<PathBuf>,
    /// Bound on one browser capture; the browser is killed past it.
    pub screenshot_timeout: Duration,
    pub user_agent: String,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            screenshot_browser: None,
            screenshot_timeout: SCREENSHOT_TIMEOUT,
            user_agent: format!("pagescope/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl AnalyzerOptions {
    pub fn from_env() -> Self {
        Self {
            screenshot_browser: std::env::var_os(SCREENSHOT_BROWSER_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            ..Default::default()
        }
    }
}

/// Run every analyzer and combine their fragments.
pub fn analyze_page(
    url: &str,
    scraping: &ScrapingData,
    html: &str,
    options: &AnalyzerOptions,
) -> ProcessingData {
    debug!(url = %url, "Analyzing page");

    ProcessingData {
        screenshot: capture_screenshot(url, options),
        performance: Some(measure_performance(url, &options.user_agent)),
        thumbnails: Some(generate_thumbnails(scraping, &options.user_agent)),
        advanced: Some(analyze_advanced(url, scraping, html)),
    }
}
