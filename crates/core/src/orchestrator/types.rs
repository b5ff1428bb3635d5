//! Types for the scrape orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::analysis::ProcessingData;
use crate::page::{FetchError, ScrapingData};

use super::tasks::TaskCounts;

/// Errors surfaced by a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Not an absolute http(s) URL with a host.
    #[error("invalid URL: {0:?}")]
    InvalidUrl(String),

    #[error("rate limit exceeded for domain {domain:?}: {count} requests in the last minute")]
    RateLimitExceeded { domain: String, count: usize },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The admission gate was closed while waiting for a slot.
    #[error("orchestrator is shutting down")]
    GateClosed,
}

/// Whether back-tier enrichment succeeded for a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Success,
    Failed,
}

/// Final result of a pipeline run.
///
/// `status` is always `"success"` once scraping succeeded; a failed
/// enrichment only shows in `processing_status` with placeholder data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// Effective URL after redirects.
    pub url: String,
    /// RFC 3339 UTC, whole seconds.
    pub timestamp: String,
    pub scraping_data: ScrapingData,
    pub processing_data: ProcessingData,
    pub status: String,
    pub processing_status: ProcessingStatus,
}

impl ScrapeResult {
    pub const STATUS_SUCCESS: &'static str = "success";

    pub fn is_degraded(&self) -> bool {
        self.processing_status == ProcessingStatus::Failed
    }
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Cached results, stale ones included.
    pub cache_entries: usize,
    /// Domains with a rate window.
    pub tracked_domains: usize,
    /// Free admission slots.
    pub available_slots: usize,
    /// Admission gate size.
    pub workers: usize,
    pub tasks: TaskCounts,
}

/// Parse and check a submitted URL: scheme must be http or https and the
/// host non-empty.
pub fn validate_url(raw: &str) -> Result<Url, PipelineError> {
    let invalid = || PipelineError::InvalidUrl(raw.to_string());

    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(invalid()),
    }
}

/// Rate-limit key for a validated URL.
pub fn domain_of(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_ascii_lowercase()
}
