//! Scrape orchestrator implementation.
//!
//! Drives every URL through the pipeline:
//! - Cache lookup (hits bypass everything else)
//! - Per-domain rate limiting
//! - Admission gate, then fetch, extract and back-tier enrichment
//!
//! Background tasks run the same pipeline on a spawned future and record
//! their progress in the task registry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::analysis::ProcessingData;
use crate::config::ScraperConfig;
use crate::metrics;
use crate::page::{extract_page_data, PageFetcher};
use crate::protocol::ProcessPageRequest;

use super::backend::{BackendError, ProcessingBackend};
use super::cache::ResultCache;
use super::rate_limiter::RateLimiter;
use super::tasks::{TaskRecord, TaskRegistry, TaskStatus};
use super::types::{
    domain_of, validate_url, OrchestratorStatus, PipelineError, ProcessingStatus, ScrapeResult,
};

/// The scrape orchestrator - owns cache, rate windows, tasks and admission.
pub struct ScrapeOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    backend: Arc<dyn ProcessingBackend>,
    cache: ResultCache<ScrapeResult>,
    rate_limiter: RateLimiter,
    tasks: TaskRegistry,
    gate: Semaphore,
    workers: usize,
}

impl ScrapeOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: &ScraperConfig,
        fetcher: Arc<dyn PageFetcher>,
        backend: Arc<dyn ProcessingBackend>,
    ) -> Self {
        let workers = config.workers.max(1);
        Self {
            fetcher,
            backend,
            cache: ResultCache::new(Duration::from_secs(config.cache_ttl_secs)),
            rate_limiter: RateLimiter::new(config.rate_limit_per_minute),
            tasks: TaskRegistry::new(),
            gate: Semaphore::new(workers),
            workers,
        }
    }

    /// Run the full pipeline for `url` and return the final result.
    pub async fn run_pipeline(&self, url: &str) -> Result<ScrapeResult, PipelineError> {
        let url = validate_url(url).inspect_err(|_| {
            metrics::PIPELINE_RUNS.with_label_values(&["invalid_url"]).inc();
        })?;
        self.execute(&url, None).await
    }

    /// Register a background task for `url` and start it. The URL is
    /// validated before anything is created.
    pub async fn create_task(self: &Arc<Self>, url: &str) -> Result<String, PipelineError> {
        let url = validate_url(url).inspect_err(|_| {
            metrics::PIPELINE_RUNS.with_label_values(&["invalid_url"]).inc();
        })?;

        let id = self.tasks.create(url.as_str()).await;
        metrics::TASKS_CREATED.inc();
        info!(task_id = %id, url = %url, "Task created");

        let orchestrator = Arc::clone(self);
        let task_id = id.clone();
        tokio::spawn(async move {
            orchestrator.run_task(&task_id, url).await;
        });

        Ok(id)
    }

    pub async fn task_status(&self, id: &str) -> Option<TaskRecord> {
        self.tasks.get(id).await
    }

    /// Same record as [`task_status`](Self::task_status); `result` is only
    /// set once the task has completed.
    pub async fn task_result(&self, id: &str) -> Option<TaskRecord> {
        self.tasks.get(id).await
    }

    pub async fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            cache_entries: self.cache.len().await,
            tracked_domains: self.rate_limiter.tracked_domains().await,
            available_slots: self.gate.available_permits(),
            workers: self.workers,
            tasks: self.tasks.counts().await,
        }
    }

    /// Stop admitting pipeline runs. Runs waiting for a slot fail with
    /// [`PipelineError::GateClosed`].
    pub fn shutdown(&self) {
        self.gate.close();
    }

    async fn run_task(&self, id: &str, url: Url) {
        match self.execute(&url, Some(id)).await {
            Ok(result) => {
                if let Err(e) = self.tasks.complete(id, result).await {
                    warn!(task_id = %id, error = %e, "Failed to record task result");
                } else {
                    info!(task_id = %id, "Task completed");
                }
            }
            Err(err) => {
                warn!(task_id = %id, error = %err, "Task failed");
                if let Err(e) = self.tasks.fail(id, err.to_string()).await {
                    warn!(task_id = %id, error = %e, "Failed to record task failure");
                }
            }
        }
    }

    async fn execute(&self, url: &Url, task: Option<&str>) -> Result<ScrapeResult, PipelineError> {
        let key = url.to_string();

        if self.cache.is_enabled() {
            if let Some(cached) = self.cache.get(&key).await {
                debug!(url = %url, "Cache hit");
                metrics::CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
                metrics::PIPELINE_RUNS.with_label_values(&["cached"]).inc();
                return Ok(cached);
            }
            metrics::CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
        }

        let domain = domain_of(url);
        if let Err(limited) = self.rate_limiter.try_acquire(&domain).await {
            info!(
                domain = %limited.domain,
                count = limited.count,
                retry_after_ms = limited.retry_after_ms,
                "Rate limit exceeded"
            );
            metrics::RATE_LIMITED.inc();
            metrics::PIPELINE_RUNS.with_label_values(&["rate_limited"]).inc();
            return Err(PipelineError::RateLimitExceeded {
                domain: limited.domain,
                count: limited.count,
            });
        }

        let started = Instant::now();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| PipelineError::GateClosed)?;

        self.mark(task, TaskStatus::Scraping).await;
        let page = self.fetcher.fetch(url.as_str()).await.inspect_err(|e| {
            warn!(url = %url, error = %e, "Fetch failed");
            metrics::PIPELINE_RUNS.with_label_values(&["fetch_failed"]).inc();
        })?;
        let scraping_data = extract_page_data(&page.body, &page.final_url);

        self.mark(task, TaskStatus::Processing).await;
        let request = ProcessPageRequest::new(page.final_url, scraping_data, page.body);
        let (processing_data, processing_status) = match self.backend.process(&request).await {
            Ok(data) => (data, ProcessingStatus::Success),
            Err(e) => {
                warn!(url = %request.url, error = %e, "Enrichment unavailable, returning degraded result");
                metrics::BACKEND_DEGRADED
                    .with_label_values(&[degraded_reason(&e)])
                    .inc();
                (ProcessingData::placeholder(), ProcessingStatus::Failed)
            }
        };
        let ProcessPageRequest {
            url: final_url,
            scraping_data,
            ..
        } = request;

        let result = ScrapeResult {
            url: final_url,
            timestamp,
            scraping_data,
            processing_data,
            status: ScrapeResult::STATUS_SUCCESS.to_string(),
            processing_status,
        };
        self.cache.insert(key, result.clone()).await;
        drop(permit);

        let label = match processing_status {
            ProcessingStatus::Success => "success",
            ProcessingStatus::Failed => "degraded",
        };
        metrics::PIPELINE_RUNS.with_label_values(&[label]).inc();
        metrics::PIPELINE_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());
        info!(
            url = %result.url,
            processing_status = label,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pipeline completed"
        );

        Ok(result)
    }

    async fn mark(&self, task: Option<&str>, status: TaskStatus) {
        if let Some(id) = task {
            if let Err(e) = self.tasks.advance(id, status).await {
                warn!(task_id = %id, error = %e, "Failed to update task status");
            }
        }
    }
}

fn degraded_reason(err: &BackendError) -> &'static str {
    match err {
        BackendError::Connect { .. } => "connect",
        BackendError::Timeout(_) => "timeout",
        BackendError::Protocol(_) => "protocol",
        BackendError::Rejected(_) => "rejected",
    }
}
