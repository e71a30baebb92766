// Remote content retrieval for image (and video) URLs.
//
// Fetching happens before any provider runs, so every failure here is
// reported to the caller rather than folded into a verdict. The body is
// streamed against a byte ceiling so an oversized response is cut off
// early instead of buffered in full.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use crate::content::{ContentItem, ContentKind};
use crate::error::{FetchError, ModerationError};

/// Bytes plus the content-type the server declared for them.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Fetched {
    pub fn kind(&self) -> ContentKind {
        if self.content_type.starts_with("video/") {
            ContentKind::Video
        } else {
            ContentKind::Image
        }
    }

    /// Build the content item for these bytes, decoding images.
    pub fn into_item(self) -> Result<ContentItem, ModerationError> {
        match self.kind() {
            ContentKind::Video => Ok(ContentItem::video(self.bytes)),
            _ => ContentItem::image(&self.bytes),
        }
    }
}

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError>;
}

/// Reject anything that is not an absolute http(s) URL.
pub fn check_url(url: &str) -> Result<reqwest::Url, FetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(parsed),
        _ => Err(FetchError::InvalidUrl(url.to_string())),
    }
}

/// Only image and video payloads are accepted.
pub fn check_content_type(content_type: &str) -> Result<(), FetchError> {
    let lower = content_type.trim().to_ascii_lowercase();
    if lower.starts_with("image/") || lower.starts_with("video/") {
        Ok(())
    } else {
        Err(FetchError::UnsupportedContentType(content_type.to_string()))
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sentinel/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, max_bytes })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        let url = check_url(url)?;
        debug!(url = %url, "Fetching remote content");

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        check_content_type(&content_type)?;

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(FetchError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?
        {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        info!(url = %url, content_type = %content_type, bytes = bytes.len(), "Fetched remote content");
        Ok(Fetched {
            bytes,
            content_type,
        })
    }
}
