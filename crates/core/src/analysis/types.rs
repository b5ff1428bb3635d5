//! Result fragments produced by the analyzers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Combined output of the analyzers for one page.
///
/// The all-`None` value is the placeholder used whenever enrichment did not
/// happen, so callers only ever branch on status, never on shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingData {
    /// Base64-encoded PNG.
    pub screenshot: Option<String>,
    pub performance: Option<PerformanceMetrics>,
    /// Base64-encoded PNG thumbnails.
    pub thumbnails: Option<Vec<String>>,
    pub advanced: Option<AdvancedAnalysis>,
}

impl ProcessingData {
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_placeholder(&self) -> bool {
        self.screenshot.is_none()
            && self.performance.is_none()
            && self.thumbnails.is_none()
            && self.advanced.is_none()
    }
}

/// Load metrics from re-fetching the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub load_time_ms: Option<u64>,
    pub total_size_kb: Option<f64>,
    pub num_requests: u32,
}

/// Heuristic technology, SEO, structured-data and accessibility report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedAnalysis {
    pub url: String,
    pub technologies: Technologies,
    pub seo: SeoReport,
    pub structured_data: StructuredData,
    pub accessibility: Accessibility,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Technologies {
    pub frameworks_js: Vec<String>,
    pub cms: Option<String>,
    pub other: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeoReport {
    /// 0-100.
    pub score: u8,
    pub has_meta_description: bool,
    pub has_keywords: bool,
    pub has_h1: bool,
    pub title_length: usize,
    pub h1_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredData {
    pub json_ld_count: usize,
    pub schema_org_detected: bool,
    pub examples: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Accessibility {
    pub total_images: Option<usize>,
    pub images_with_alt: Option<usize>,
    /// Fraction of images with a non-blank `alt`, `None` without images.
    pub alt_coverage: Option<f64>,
}
