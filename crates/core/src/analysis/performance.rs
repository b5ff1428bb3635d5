//! Load-time measurement by re-fetching the page.

use std::time::{Duration, Instant};

use tracing::debug;

use super::types::PerformanceMetrics;

const MEASURE_TIMEOUT: Duration = Duration::from_secs(20);

/// Time a fresh GET of `url`. Failures yield empty metrics, never an error.
pub fn measure(url: &str, user_agent: &str) -> PerformanceMetrics {
    match timed_fetch(url, user_agent) {
        Ok((elapsed, bytes)) => PerformanceMetrics {
            load_time_ms: Some(elapsed.as_millis() as u64),
            total_size_kb: Some(round2(bytes as f64 / 1024.0)),
            num_requests: 1,
        },
        Err(e) => {
            debug!(url = %url, error = %e, "Performance measurement failed");
            PerformanceMetrics::default()
        }
    }
}

fn timed_fetch(url: &str, user_agent: &str) -> reqwest::Result<(Duration, usize)> {
    let client = reqwest::blocking::Client::builder()
        .timeout(MEASURE_TIMEOUT)
        .user_agent(user_agent)
        .build()?;

    let started = Instant::now();
    let body = client.get(url).send()?.error_for_status()?.bytes()?;
    Ok((started.elapsed(), body.len()))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
