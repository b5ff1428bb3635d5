//! Page screenshots.
//!
//! With a headless browser configured the page is rendered for real;
//! otherwise (or when the browser fails) a placeholder image is produced so
//! the field is still populated.

use std::io::Cursor;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tracing::{debug, warn};
use uuid::Uuid;

use super::AnalyzerOptions;

pub const SCREENSHOT_WIDTH: u32 = 1280;
pub const SCREENSHOT_HEIGHT: u32 = 720;
pub const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(30);

const BANNER_HEIGHT: u32 = 64;
const BROWSER_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Base64 PNG of the page, `None` only if even the placeholder failed.
pub fn capture(url: &str, options: &AnalyzerOptions) -> Option<String> {
    if let Some(browser) = options.screenshot_browser.as_deref() {
        match capture_with_browser(browser, url, options.screenshot_timeout) {
            Ok(png) => return Some(STANDARD.encode(png)),
            Err(e) => warn!(url = %url, error = %e, "Browser screenshot failed, using placeholder"),
        }
    }

    match render_placeholder(url) {
        Ok(png) => Some(STANDARD.encode(png)),
        Err(e) => {
            warn!(url = %url, error = %e, "Failed to render placeholder screenshot");
            None
        }
    }
}

fn capture_with_browser(browser: &Path, url: &str, limit: Duration) -> std::io::Result<Vec<u8>> {
    let target = std::env::temp_dir().join(format!("pagescope-shot-{}.png", Uuid::new_v4().simple()));

    debug!(browser = %browser.display(), url = %url, "Capturing screenshot");
    let mut child = Command::new(browser)
        .arg("--headless")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--hide-scrollbars")
        .arg(format!("--window-size={},{}", SCREENSHOT_WIDTH, SCREENSHOT_HEIGHT))
        .arg(format!("--screenshot={}", target.display()))
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let deadline = Instant::now() + limit;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            break Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("browser did not finish within {:?}", limit),
            ));
        }
        thread::sleep(BROWSER_POLL_INTERVAL);
    };

    let result = match status {
        Ok(status) if status.success() => std::fs::read(&target),
        Ok(status) => Err(std::io::Error::other(format!("browser exited with {}", status))),
        Err(e) => Err(e),
    };
    let _ = std::fs::remove_file(&target);
    result
}

/// Neutral canvas with a banner whose colour is derived from the URL, so
/// different pages are distinguishable at a glance.
fn render_placeholder(url: &str) -> image::ImageResult<Vec<u8>> {
    let accent = accent_colour(url);
    let canvas = RgbImage::from_fn(SCREENSHOT_WIDTH, SCREENSHOT_HEIGHT, |_, y| {
        if y < BANNER_HEIGHT {
            accent
        } else {
            Rgb([240, 240, 240])
        }
    });

    let mut png = Vec::new();
    DynamicImage::ImageRgb8(canvas).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

fn accent_colour(url: &str) -> Rgb<u8> {
    // FNV-1a
    let hash = url
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100_0000_01b3));
    let [r, g, b, ..] = hash.to_le_bytes();
    Rgb([r / 2 + 64, g / 2 + 64, b / 2 + 64])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(b64: &str) -> DynamicImage {
        let bytes = STANDARD.decode(b64).unwrap();
        image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap()
    }

    #[test]
    fn test_placeholder_without_browser() {
        let shot = capture("https://example.com/", &AnalyzerOptions::default()).unwrap();
        let img = decode(&shot);
        assert_eq!(img.width(), SCREENSHOT_WIDTH);
        assert_eq!(img.height(), SCREENSHOT_HEIGHT);
    }

    #[test]
    fn test_placeholder_when_browser_missing() {
        let options = AnalyzerOptions {
            screenshot_browser: Some("/nonexistent/browser".into()),
            ..Default::default()
        };
        let shot = capture("https://example.com/", &options).unwrap();
        assert_eq!(decode(&shot).width(), SCREENSHOT_WIDTH);
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_browser_is_killed_and_replaced_by_placeholder() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let browser = dir.path().join("browser");
        std::fs::write(&browser, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&browser, std::fs::Permissions::from_mode(0o755)).unwrap();

        let options = AnalyzerOptions {
            screenshot_browser: Some(browser),
            screenshot_timeout: Duration::from_millis(300),
            ..Default::default()
        };

        let started = Instant::now();
        let shot = capture("https://example.com/", &options).unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(decode(&shot).width(), SCREENSHOT_WIDTH);
    }

    #[test]
    fn test_accent_depends_on_url() {
        assert_eq!(accent_colour("a"), accent_colour("a"));
        assert_ne!(accent_colour("https://a.test/"), accent_colour("https://b.test/"));
    }
}
