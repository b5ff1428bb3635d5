//! Structural extraction of an HTML body into [`ScrapingData`].

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use super::types::ScrapingData;

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));
static IMAGES: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").expect("valid selector"));
static META_NAMED: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[name]").expect("valid selector"));
static META_PROPERTY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property]").expect("valid selector"));
static HEADERS: Lazy<Vec<(String, Selector)>> = Lazy::new(|| {
    (1..=6)
        .map(|level| {
            let tag = format!("h{}", level);
            let selector = Selector::parse(&tag).expect("valid selector");
            (tag, selector)
        })
        .collect()
});

/// Meta tags collected by name (in addition to every `og:*` property).
const NAMED_META: [&str; 2] = ["description", "keywords"];

/// Parse `html` and extract the fielded record, resolving relative links and
/// image sources against `base_url`.
pub fn extract_page_data(html: &str, base_url: &str) -> ScrapingData {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let links: Vec<String> = document
        .select(&LINKS)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| resolve(base.as_ref(), href))
        .collect();

    let images: Vec<String> = document
        .select(&IMAGES)
        .filter_map(|el| el.value().attr("src"))
        .map(|src| resolve(base.as_ref(), src))
        .collect();

    let structure = HEADERS
        .iter()
        .map(|(tag, selector)| (tag.clone(), document.select(selector).count()))
        .collect();

    let mut data = ScrapingData {
        title,
        links,
        meta_tags: Default::default(),
        structure,
        images_count: images.len(),
        images,
    };
    collect_meta(&document, &mut data);
    data
}

fn collect_meta(document: &Html, data: &mut ScrapingData) {
    for name in NAMED_META {
        let content = document
            .select(&META_NAMED)
            .filter(|el| el.value().attr("name") == Some(name))
            .find_map(|el| el.value().attr("content"))
            .map(str::trim)
            .filter(|c| !c.is_empty());
        if let Some(content) = content {
            data.meta_tags.insert(name.to_string(), content.to_string());
        }
    }

    for el in document.select(&META_PROPERTY) {
        let (Some(property), Some(content)) = (el.value().attr("property"), el.value().attr("content"))
        else {
            continue;
        };
        let content = content.trim();
        if property.starts_with("og:") && !content.is_empty() {
            data.meta_tags
                .insert(property.to_string(), content.to_string());
        }
    }
}

/// Resolve a reference against the base URL, keeping it verbatim when the base
/// is unusable or the join fails.
fn resolve(base: Option<&Url>, reference: &str) -> String {
    let reference = reference.trim();
    base.and_then(|b| b.join(reference).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| reference.to_string())
}
