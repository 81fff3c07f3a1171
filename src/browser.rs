//! Blob link resolution through a headless browser.
//!
//! A `blob:` URL only exists inside the page that created it, so the page is
//! rendered in headless Chrome and the `src` of its first image element is
//! read back. The browser process lives only for the duration of one
//! resolution and is torn down on every path.

use crate::fetch::FetchError;
use headless_chrome::{Browser, LaunchOptions};
use std::time::Duration;
use url::Url;

/// Resolves a blob page to the source URL of its image
pub trait BlobResolver {
    fn resolve_image_src(&self, url: &str) -> Result<String, FetchError>;
}

/// Headless Chrome resolver
pub struct HeadlessBrowser {
    wait: Duration,
}

impl HeadlessBrowser {
    /// `wait` bounds how long to wait for an `img` element to appear
    pub fn new(wait: Duration) -> Self {
        Self { wait }
    }
}

/// Owns the browser process; dropping it closes the browser.
struct BrowserSession {
    browser: Browser,
}

impl BrowserSession {
    fn launch() -> Result<Self, FetchError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .map_err(|e| FetchError::Browser(format!("launch options: {}", e)))?;

        tracing::debug!("Launching headless browser");
        let browser = Browser::new(options).map_err(|e| {
            tracing::error!("Failed to launch headless browser: {}", e);
            FetchError::Browser(e.to_string())
        })?;

        Ok(Self { browser })
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        tracing::debug!("Closing headless browser");
    }
}

impl BlobResolver for HeadlessBrowser {
    fn resolve_image_src(&self, url: &str) -> Result<String, FetchError> {
        let session = BrowserSession::launch()?;

        let tab = session
            .browser
            .new_tab()
            .map_err(|e| FetchError::Browser(format!("new tab: {}", e)))?;

        tracing::debug!("Navigating to {}", url);
        tab.navigate_to(url)
            .map_err(|e| FetchError::Browser(format!("navigate to {}: {}", url, e)))?;

        let element = tab
            .wait_for_element_with_custom_timeout("img", self.wait)
            .map_err(|e| {
                tracing::warn!("No image element on {} within {:?}: {}", url, self.wait, e);
                FetchError::Browser(format!("no image found within {:?}", self.wait))
            })?;

        // The `src` property is already resolved against the page; the
        // attribute is the raw markup value.
        let property = element
            .call_js_fn("function() { return this.src; }", vec![], false)
            .map_err(|e| FetchError::Browser(format!("read src: {}", e)))?
            .value
            .and_then(|value| value.as_str().map(str::to_string));

        let src = match property {
            Some(src) => Some(src),
            None => element
                .get_attribute_value("src")
                .map_err(|e| FetchError::Browser(format!("read src: {}", e)))?,
        }
        .filter(|src| !src.is_empty())
        .ok_or_else(|| FetchError::Browser("image element has no src".to_string()))?;

        tracing::info!("Resolved blob image source: {}", truncate(&src, 120));
        Ok(src)
    }
}

/// Make an image source absolute against the page it was found on.
///
/// Absolute sources (including `data:` and `blob:`) are returned unchanged.
/// A `blob:` page URL contributes its inner origin URL as the base.
pub fn absolute_src(page_url: &str, src: &str) -> Result<String, FetchError> {
    if Url::parse(src).is_ok() {
        return Ok(src.to_string());
    }

    let base = page_url.strip_prefix("blob:").unwrap_or(page_url);
    Url::parse(base)
        .and_then(|base| base.join(src))
        .map(String::from)
        .map_err(|e| {
            FetchError::Browser(format!("cannot resolve image source '{}': {}", src, e))
        })
}

/// Shorten long sources (inline data URLs) for logging
fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
