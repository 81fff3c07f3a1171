//! Image retrieval over HTTP.
//!
//! A single blocking GET per request with no retry. Any non-success status
//! or transport error is reported as one failure. Image bytes are decoded
//! with the format guessed from content, not from the URL.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use once_cell::unsync::OnceCell;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

/// Retrieval errors
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error: {status}")]
    Status { status: u16 },

    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Invalid data URL: {0}")]
    DataUrl(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches the body of a URL
pub trait Fetch {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking reqwest client, built on first use
pub struct HttpFetcher {
    timeout: Option<Duration>,
    client: OnceCell<reqwest::blocking::Client>,
}

impl HttpFetcher {
    /// `None` keeps the reqwest default timeout.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            client: OnceCell::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, FetchError> {
        self.client.get_or_try_init(|| {
            let mut builder = reqwest::blocking::Client::builder();
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }
            Ok(builder.build()?)
        })
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("GET {}", url);

        let response = self.client()?.get(url).send().map_err(|e| {
            tracing::warn!("Request failed: {} for {}", e, url);
            FetchError::Request(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("HTTP error: {} for {}", status, url);
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes()?;
        tracing::debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Fetch an image source, decoding `data:` URLs locally.
///
/// Image elements on blob pages frequently carry an inline `data:` source
/// that has no server behind it.
pub fn fetch_source(fetcher: &dyn Fetch, src: &str) -> Result<Vec<u8>, FetchError> {
    if src.starts_with("data:") {
        decode_data_url(src)
    } else {
        fetcher.get(src)
    }
}

/// Decode a base64 `data:` URL into its payload bytes
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, FetchError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| FetchError::DataUrl("missing data: scheme".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| FetchError::DataUrl("missing ',' separator".to_string()))?;

    if !meta.ends_with(";base64") {
        return Err(FetchError::DataUrl(format!(
            "unsupported encoding '{}', expected base64",
            meta
        )));
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| FetchError::DataUrl(e.to_string()))
}

/// Decode image bytes, guessing the format from content
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, FetchError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| FetchError::Decode(image::ImageError::IoError(e)))?;

    let img = reader.decode()?;
    tracing::info!("Image decoded: {}x{}", img.width(), img.height());
    Ok(img)
}
