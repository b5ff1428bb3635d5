//! Front tier of pagescope: the HTTP surface over the scrape orchestrator.

pub mod api;
pub mod metrics;
pub mod state;
