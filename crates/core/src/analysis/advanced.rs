//! Technology detection, SEO scoring, structured data and accessibility.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::{Map, Value};

use crate::page::ScrapingData;

use super::types::{Accessibility, AdvancedAnalysis, SeoReport, StructuredData, Technologies};

static SCRIPTS: Lazy<Selector> = Lazy::new(|| Selector::parse("script").expect("valid selector"));
static GENERATOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="generator"]"#).expect("valid selector"));
static JSON_LD: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});
static IMAGES: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("valid selector"));

const CMS_MARKERS: [(&str, &str); 3] = [
    ("wordpress", "WordPress"),
    ("drupal", "Drupal"),
    ("joomla", "Joomla"),
];

const JS_FRAMEWORKS: [(&str, &str); 6] = [
    ("react", "React"),
    ("angular", "Angular"),
    ("vue", "Vue.js"),
    ("jquery", "jQuery"),
    ("next.js", "Next.js"),
    ("nuxt.js", "Nuxt.js"),
];

/// Only the first few JSON-LD blocks are summarised.
const MAX_JSON_LD_EXAMPLES: usize = 3;

pub fn analyze(url: &str, scraping: &ScrapingData, html: &str) -> AdvancedAnalysis {
    let document = (!html.is_empty()).then(|| Html::parse_document(html));

    AdvancedAnalysis {
        url: url.to_string(),
        technologies: detect_technologies(document.as_ref(), html),
        seo: score_seo(scraping),
        structured_data: structured_data(document.as_ref()),
        accessibility: accessibility(document.as_ref(), scraping),
    }
}

fn detect_technologies(document: Option<&Html>, html: &str) -> Technologies {
    let html_lower = html.to_lowercase();
    let mut tech = Technologies::default();

    if html_lower.contains("wp-content") {
        tech.cms = Some("WordPress".to_string());
    } else {
        tech.cms = cms_from_text(&html_lower);
    }

    let Some(document) = document else {
        return tech;
    };

    // The generator meta tag is authoritative over body markers.
    let generator = document
        .select(&GENERATOR)
        .find_map(|el| el.value().attr("content"))
        .map(str::to_lowercase);
    if let Some(cms) = generator.as_deref().and_then(cms_from_text) {
        tech.cms = Some(cms);
    }

    for script in document.select(&SCRIPTS) {
        let text = match script.value().attr("src") {
            Some(src) if !src.is_empty() => src.to_lowercase(),
            _ => script.text().collect::<String>().to_lowercase(),
        };
        for (marker, name) in JS_FRAMEWORKS {
            if text.contains(marker) && !tech.frameworks_js.iter().any(|f| f == name) {
                tech.frameworks_js.push(name.to_string());
            }
        }
    }

    if html_lower.contains("bootstrap") {
        tech.other.push("Bootstrap".to_string());
    }
    if html_lower.contains("tailwind") {
        tech.other.push("Tailwind CSS".to_string());
    }

    tech
}

fn cms_from_text(text: &str) -> Option<String> {
    CMS_MARKERS
        .iter()
        .find(|(marker, _)| text.contains(marker))
        .map(|(_, name)| name.to_string())
}

fn score_seo(scraping: &ScrapingData) -> SeoReport {
    let has_meta_description = scraping.meta("description").is_some();
    let has_keywords = scraping.meta("keywords").is_some();
    let has_og_title = scraping.meta("og:title").is_some();
    let h1_count = scraping.header_count(1);
    let title_length = scraping.title.chars().count();

    let mut score: i32 = 0;
    if has_meta_description {
        score += 30;
    }
    if h1_count >= 1 {
        score += 20;
    }
    if (10..=70).contains(&title_length) {
        score += 20;
    }
    if has_og_title {
        score += 15;
    }
    if has_keywords {
        score += 10;
    }
    if title_length < 3 {
        score -= 10;
    }

    SeoReport {
        score: score.clamp(0, 100) as u8,
        has_meta_description,
        has_keywords,
        has_h1: h1_count >= 1,
        title_length,
        h1_count,
    }
}

fn structured_data(document: Option<&Html>) -> StructuredData {
    let Some(document) = document else {
        return StructuredData::default();
    };

    let blocks: Vec<String> = document
        .select(&JSON_LD)
        .map(|el| el.text().collect())
        .collect();

    let mut data = StructuredData {
        json_ld_count: blocks.len(),
        ..Default::default()
    };

    for text in blocks.iter().take(MAX_JSON_LD_EXAMPLES) {
        if text.to_lowercase().contains("schema.org") {
            data.schema_org_detected = true;
        }
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            data.examples.push(simplify_json_ld(value));
        }
    }

    data
}

/// Keep only the identifying keys of a JSON-LD object, if it has any.
fn simplify_json_ld(value: Value) -> Value {
    if let Value::Object(ref object) = value {
        let summary: Map<String, Value> = ["@type", "name", "headline"]
            .iter()
            .filter_map(|key| object.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect();
        if !summary.is_empty() {
            return Value::Object(summary);
        }
    }
    value
}

fn accessibility(document: Option<&Html>, scraping: &ScrapingData) -> Accessibility {
    let Some(document) = document else {
        return Accessibility {
            total_images: Some(scraping.images_count),
            images_with_alt: None,
            alt_coverage: None,
        };
    };

    let mut total = 0usize;
    let mut with_alt = 0usize;
    for img in document.select(&IMAGES) {
        total += 1;
        if img.value().attr("alt").is_some_and(|alt| !alt.trim().is_empty()) {
            with_alt += 1;
        }
    }

    Accessibility {
        total_images: Some(total),
        images_with_alt: Some(with_alt),
        alt_coverage: (total > 0).then(|| with_alt as f64 / total as f64),
    }
}
