//! Structured record extracted from a page.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fielded view of a fetched page.
///
/// Every field defaults when absent so that records arriving over the wire
/// from older or partial producers still decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingData {
    /// Trimmed `<title>` text, empty when the page has none.
    pub title: String,
    /// Absolute URLs of every `a[href]`.
    pub links: Vec<String>,
    /// `description`, `keywords` and every `og:*` property.
    pub meta_tags: BTreeMap<String, String>,
    /// Header counts keyed `h1`..`h6`.
    pub structure: BTreeMap<String, usize>,
    pub images_count: usize,
    /// Absolute URLs of every `img[src]`.
    pub images: Vec<String>,
}

impl ScrapingData {
    /// Number of headers at the given level (1-6).
    pub fn header_count(&self, level: u8) -> usize {
        self.structure
            .get(&format!("h{}", level))
            .copied()
            .unwrap_or(0)
    }

    pub fn meta(&self, name: &str) -> Option<&str> {
        self.meta_tags
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}
