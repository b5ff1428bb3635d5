//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator (pipeline runs, cache, rate limiting, tasks)
//! - Back-tier enrichment (degraded calls)
//!
//! All of them are recorded in the front tier. Worker pool activity lives in
//! the back tier's own process and is reported through
//! [`PoolStatus`](crate::dispatcher::PoolStatus).

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Orchestrator
// =============================================================================

/// Pipeline runs by result.
pub static PIPELINE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pagescope_pipeline_runs_total", "Total pipeline runs"),
        &["result"], // "success", "degraded", "cached", "invalid_url", "rate_limited", "fetch_failed"
    )
    .unwrap()
});

/// Pipeline duration in seconds (fresh runs only).
pub static PIPELINE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pagescope_pipeline_duration_seconds",
            "Duration of a fresh pipeline run",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["processing_status"],
    )
    .unwrap()
});

/// Cache lookups by result.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pagescope_cache_lookups_total", "Result cache lookups"),
        &["result"], // "hit", "miss"
    )
    .unwrap()
});

/// Requests rejected by the per-domain rate limiter.
pub static RATE_LIMITED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pagescope_rate_limited_total",
        "Requests rejected by the per-domain rate limiter",
    )
    .unwrap()
});

/// Background tasks created.
pub static TASKS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("pagescope_tasks_created_total", "Background tasks created").unwrap()
});

// =============================================================================
// Back-tier client
// =============================================================================

/// Enrichment calls that fell back to placeholder data, by reason.
pub static BACKEND_DEGRADED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pagescope_backend_degraded_total",
            "Enrichment calls that degraded to placeholder data",
        ),
        &["reason"], // "connect", "timeout", "protocol", "rejected"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Orchestrator
        Box::new(PIPELINE_RUNS.clone()),
        Box::new(PIPELINE_DURATION.clone()),
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(RATE_LIMITED.clone()),
        Box::new(TASKS_CREATED.clone()),
        // Back-tier client
        Box::new(BACKEND_DEGRADED.clone()),
    ]
}
