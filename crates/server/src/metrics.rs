//! Prometheus metrics for the front tier.
//!
//! HTTP request metrics are recorded by the middleware; orchestrator gauges
//! are refreshed from [`ScrapeOrchestrator::status`] each time `/metrics` is
//! scraped. Counters owned by the core library are registered here too.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use pagescope_core::ScrapeOrchestrator;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pagescope_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pagescope_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pagescope_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Metrics (collected dynamically)
// =============================================================================

/// Tasks currently in each status.
pub static TASKS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("pagescope_tasks", "Number of tasks by status"),
        &["status"],
    )
    .unwrap()
});

/// Entries held by the result cache, expired ones included until touched.
pub static CACHE_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("pagescope_cache_entries", "Entries in the result cache").unwrap()
});

/// Free slots in the admission gate.
pub static AVAILABLE_SLOTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pagescope_available_slots",
        "Pipeline admission slots currently free",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Orchestrator gauges
    registry
        .register(Box::new(TASKS_BY_STATUS.clone()))
        .unwrap();
    registry.register(Box::new(CACHE_ENTRIES.clone())).unwrap();
    registry.register(Box::new(AVAILABLE_SLOTS.clone())).unwrap();

    // Core counters
    for collector in pagescope_core::metrics::all_metrics() {
        registry.register(collector).unwrap();
    }
}

/// Encode all metrics in Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh the gauges that mirror orchestrator state.
pub async fn collect_dynamic_metrics(orchestrator: &ScrapeOrchestrator) {
    let status = orchestrator.status().await;

    CACHE_ENTRIES.set(status.cache_entries as i64);
    AVAILABLE_SLOTS.set(status.available_slots as i64);

    let tasks = status.tasks;
    for (label, count) in [
        ("pending", tasks.pending),
        ("scraping", tasks.scraping),
        ("processing", tasks.processing),
        ("completed", tasks.completed),
        ("failed", tasks.failed),
    ] {
        TASKS_BY_STATUS
            .with_label_values(&[label])
            .set(count as i64);
    }
}

/// Collapse task ids in a request path so they don't explode label cardinality.
pub fn normalize_path(path: &str) -> String {
    static TASK_ID: Lazy<regex_lite::Regex> =
        Lazy::new(|| regex_lite::Regex::new(r"/[0-9a-fA-F]{32}(/|$)").unwrap());

    TASK_ID.replace_all(path, "/{id}$1").to_string()
}
