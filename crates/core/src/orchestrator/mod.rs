//! Front-tier scrape orchestrator.
//!
//! The single authority over caching, per-domain rate limiting, admission
//! control and background task state:
//! - **Cache**: lazily expiring results keyed by normalized URL
//! - **Rate limiter**: sliding one-minute window per domain
//! - **Tasks**: forward-only status records, never evicted
//! - **Backend**: one fresh connection to the back tier per enrichment

mod backend;
mod cache;
mod rate_limiter;
mod runner;
mod tasks;
mod types;

pub use backend::{BackendError, ProcessingBackend, TcpBackend};
pub use cache::ResultCache;
pub use rate_limiter::{RateLimitStatus, RateLimited, RateLimiter, RATE_WINDOW};
pub use runner::ScrapeOrchestrator;
pub use tasks::{TaskCounts, TaskError, TaskRecord, TaskRegistry, TaskStatus};
pub use types::{
    domain_of, validate_url, OrchestratorStatus, PipelineError, ProcessingStatus, ScrapeResult,
};
