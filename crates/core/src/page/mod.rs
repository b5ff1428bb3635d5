//! Page retrieval and structural extraction.
//!
//! These are the collaborators the orchestrator calls before handing work to
//! the back tier: a [`PageFetcher`] that downloads a body bounded by a maximum
//! size, and [`extract_page_data`] which turns that body into [`ScrapingData`].

mod extract;
mod fetch;
mod types;

pub use extract::extract_page_data;
pub use fetch::{FetchError, FetchedPage, HttpFetcher, PageFetcher};
pub use types::ScrapingData;
