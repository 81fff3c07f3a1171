//! Link parsing and classification

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Link validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("Enter a link!")]
    Empty,
}

/// A user-supplied link, classified by how its image is retrieved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// `blob:` reference, resolved through a headless browser
    Blob(String),
    /// Document whose first page is rasterized
    Pdf(String),
    /// Plain image URL fetched as-is
    Direct(String),
}

impl Link {
    /// Trim and classify a raw link.
    ///
    /// Rules are checked in order: `blob:` prefix, then `.pdf` suffix,
    /// everything else is a direct fetch.
    pub fn parse(raw: &str) -> Result<Self, LinkError> {
        let url = raw.trim();
        if url.is_empty() {
            return Err(LinkError::Empty);
        }

        let url = url.to_string();
        if url.starts_with("blob:") {
            Ok(Link::Blob(url))
        } else if url.ends_with(".pdf") {
            Ok(Link::Pdf(url))
        } else {
            Ok(Link::Direct(url))
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Link::Blob(url) | Link::Pdf(url) | Link::Direct(url) => url,
        }
    }

    /// Short name of the retrieval path, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Link::Blob(_) => "blob",
            Link::Pdf(_) => "pdf",
            Link::Direct(_) => "direct",
        }
    }
}

impl FromStr for Link {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Link::parse(s)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url())
    }
}
