//! Thumbnails of the first few page images.

use std::io::{Cursor, Read};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use tracing::debug;

use crate::page::ScrapingData;

pub const MAX_THUMBNAILS: usize = 3;
pub const THUMBNAIL_SIZE: u32 = 200;

const IMAGE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Base64 PNG thumbnails for up to [`MAX_THUMBNAILS`] images. Images that
/// cannot be fetched or decoded are skipped.
pub fn generate(scraping: &ScrapingData, user_agent: &str) -> Vec<String> {
    if scraping.images.is_empty() {
        return Vec::new();
    }

    let client = match reqwest::blocking::Client::builder()
        .timeout(IMAGE_TIMEOUT)
        .user_agent(user_agent)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            debug!(error = %e, "Failed to build image client");
            return Vec::new();
        }
    };

    scraping
        .images
        .iter()
        .take(MAX_THUMBNAILS)
        .filter_map(|src| match fetch_image(&client, src) {
            Ok(bytes) => match thumbnail_png(&bytes) {
                Ok(png) => Some(STANDARD.encode(png)),
                Err(e) => {
                    debug!(image = %src, error = %e, "Skipping undecodable image");
                    None
                }
            },
            Err(e) => {
                debug!(image = %src, error = %e, "Skipping unreachable image");
                None
            }
        })
        .collect()
}

#[derive(Debug, Error)]
enum ImageFetchError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("failed to read image body: {0}")]
    Read(#[from] std::io::Error),
}

fn fetch_image(client: &reqwest::blocking::Client, src: &str) -> Result<Vec<u8>, ImageFetchError> {
    let response = client.get(src).send()?.error_for_status()?;
    read_capped(response)
}

/// Read at most [`MAX_IMAGE_BYTES`]. Truncated oversize images fail to
/// decode and are skipped.
fn read_capped<R: Read>(reader: R) -> Result<Vec<u8>, ImageFetchError> {
    let mut bytes = Vec::new();
    reader.take(MAX_IMAGE_BYTES).read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Shrink to fit within [`THUMBNAIL_SIZE`] square (aspect preserved), as RGB PNG.
pub fn thumbnail_png(bytes: &[u8]) -> image::ImageResult<Vec<u8>> {
    let image = image::load_from_memory(bytes)?;
    let thumb = DynamicImage::ImageRgb8(image.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE).to_rgb8());

    let mut png = Vec::new();
    thumb.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}
