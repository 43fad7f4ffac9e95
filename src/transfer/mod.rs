//! Media transfer: fetch from the source site, hand off to the media host
//!
//! Each item is attempted exactly once; retry policy belongs to callers
//! (and none is applied). The fetched buffer is moved into the store call
//! and released before the next item begins, so buffers never accumulate
//! across a chunk.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CrawlConfig;
use crate::storage::{MediaStore, StoreError, StoreRequest, StoredMedia};

/// Coarse media classification, derived from the transfer response only
///
/// The URL's file extension is never consulted; the remote CDN routinely
/// serves mismatched extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimeClass {
    Image,
    Video,
    Raw,
}

impl MimeClass {
    /// Classifies a Content-Type header value
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.starts_with("image/") => Self::Image,
            Some(ct) if ct.starts_with("video/") => Self::Video,
            _ => Self::Raw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Raw => "raw",
        }
    }
}

/// One discovered media item awaiting transfer
#[derive(Debug, Clone)]
pub struct MediaItem {
    /// Remote location of the media bytes
    pub source_url: String,

    /// The post the item was found in
    pub owner_post_url: String,
}

/// Errors from a single media transfer
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Fetch failed for {url}: {source}")]
    Fetch {
        url: String,
        source: reqwest::Error,
    },

    #[error("Fetch timed out for {url}")]
    Timeout { url: String },

    #[error("Fetch returned HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Store failed for {url}: {source}")]
    Store { url: String, source: StoreError },
}

/// Transfer unit contract, kept narrow so the crawl loop can be exercised
/// against stubs
#[async_trait]
pub trait TransferUnit: Send + Sync {
    /// Moves one media item to the media host under the target's namespace
    async fn transfer(&self, item: &MediaItem, target: &str)
        -> Result<StoredMedia, TransferError>;
}

/// Downloads media items and forwards them to the media host
pub struct MediaTransfer {
    client: reqwest::Client,
    store: Arc<dyn MediaStore>,
    fetch_timeout: Duration,
}

impl MediaTransfer {
    /// Builds a transfer unit with its own HTTP client
    pub fn new(store: Arc<dyn MediaStore>, config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        // Media requests carry a browser user agent; the CDN sits behind
        // the same anti-bot stack as the listing pages.
        let client = reqwest::Client::builder()
            .user_agent(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            store,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        })
    }
}

#[async_trait]
impl TransferUnit for MediaTransfer {
    async fn transfer(
        &self,
        item: &MediaItem,
        target: &str,
    ) -> Result<StoredMedia, TransferError> {
        let url = &item.source_url;

        let response = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| classify_fetch_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::HttpStatus {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_fetch_error(url, e))?;

        let kind = MimeClass::from_content_type(Some(&content_type));

        let request = StoreRequest {
            namespace: target.to_string(),
            kind,
            content_type,
            public_id: unique_public_id(target),
        };

        // `bytes` moves into the store call and is dropped there; nothing
        // of the payload survives past this await.
        self.store
            .store(bytes, request)
            .await
            .map_err(|e| TransferError::Store {
                url: url.clone(),
                source: e,
            })
    }
}

fn classify_fetch_error(url: &str, error: reqwest::Error) -> TransferError {
    if error.is_timeout() {
        TransferError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransferError::Fetch {
            url: url.to_string(),
            source: error,
        }
    }
}

/// Generates a public id unique enough for the media host
///
/// Millisecond timestamp plus a random suffix; collisions are negligible,
/// not impossible.
fn unique_public_id(target: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", target, millis, &suffix[..6])
}
