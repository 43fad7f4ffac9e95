//! Media host storage backend
//!
//! The crawl core hands bytes plus metadata to a [`MediaStore`] and gets a
//! permanent URL back. The production implementation uploads to an HTTP
//! media host; tests substitute in-memory stores.

mod remote;

pub use remote::HttpMediaStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::transfer::MimeClass;

/// Errors from the storage backend
///
/// Uploads must fail loudly; a silently dropped item would be recorded as
/// mirrored when it was not.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Upload rejected with HTTP {status}: {body}")]
    Upload { status: u16, body: String },

    #[error("Upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Media host returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// Metadata accompanying one stored item
#[derive(Debug, Clone)]
pub struct StoreRequest {
    /// Target-derived namespace (folder) for the item
    pub namespace: String,

    /// Resource kind routing for the media host
    pub kind: MimeClass,

    /// Declared content type of the payload
    pub content_type: String,

    /// Unique identifier for the stored object
    pub public_id: String,
}

/// A successfully stored item
#[derive(Debug, Clone)]
pub struct StoredMedia {
    /// Permanent URL on the media host
    pub permanent_url: String,
}

/// Storage backend contract
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores one media payload, returning its permanent URL
    async fn store(&self, bytes: Bytes, request: StoreRequest) -> Result<StoredMedia, StoreError>;
}
