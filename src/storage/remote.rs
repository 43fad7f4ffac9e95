//! HTTP media-host upload backend

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tracing::debug;

use crate::config::StorageConfig;
use crate::storage::{MediaStore, StoreError, StoreRequest, StoredMedia};

/// Uploads media to a cloud media host over multipart HTTP
///
/// The host is expected to accept `file`, `folder`, `resource_type` and
/// `public_id` fields and answer with JSON carrying the permanent URL
/// under `secure_url` (or `url`).
pub struct HttpMediaStore {
    client: reqwest::Client,
    upload_url: String,
    namespace_prefix: String,
    api_key: Option<String>,
}

impl HttpMediaStore {
    pub fn new(config: &StorageConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            upload_url: config.upload_url.clone(),
            namespace_prefix: config.namespace_prefix.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn store(&self, bytes: Bytes, request: StoreRequest) -> Result<StoredMedia, StoreError> {
        let folder = format!("{}/{}", self.namespace_prefix, request.namespace);
        let size = bytes.len();

        let file_part = Part::stream(Body::from(bytes))
            .file_name(request.public_id.clone())
            .mime_str(&request.content_type)?;

        let form = Form::new()
            .part("file", file_part)
            .text("folder", folder)
            .text("resource_type", request.kind.as_str())
            .text("public_id", request.public_id.clone());

        let mut builder = self.client.post(&self.upload_url).multipart(form);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Upload {
                status: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        let permanent_url = payload
            .get("secure_url")
            .or_else(|| payload.get("url"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                StoreError::InvalidResponse("response carries no secure_url/url field".to_string())
            })?
            .to_string();

        debug!(
            "Stored {} ({} bytes) as {}",
            request.public_id, size, permanent_url
        );

        Ok(StoredMedia { permanent_url })
    }
}
