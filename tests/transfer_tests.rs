//! Integration tests for the media transfer path
//!
//! wiremock stands in for both the source CDN and the media host.

use std::sync::Arc;

use siphon::config::{CrawlConfig, StorageConfig};
use siphon::storage::{HttpMediaStore, MediaStore, StoreError, StoreRequest};
use siphon::transfer::{MediaItem, MediaTransfer, MimeClass, TransferError, TransferUnit};

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn storage_config(upload_url: String) -> StorageConfig {
    StorageConfig {
        upload_url,
        namespace_prefix: "mirrors".to_string(),
        api_key: None,
    }
}

fn transfer_unit(upload_url: String) -> MediaTransfer {
    let store = Arc::new(HttpMediaStore::new(&storage_config(upload_url)).unwrap());
    MediaTransfer::new(store, &CrawlConfig::default()).unwrap()
}

fn item(url: String) -> MediaItem {
    MediaItem {
        source_url: url,
        owner_post_url: "https://coomer.su/onlyfans/user/creator/post/1".to_string(),
    }
}

#[tokio::test]
async fn test_transfer_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/photo.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![1, 2, 3, 4])
                .insert_header("content-type", "image/jpeg"),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "secure_url": "https://media.test/mirrors/creator/abc"
        })))
        .mount(&server)
        .await;

    let unit = transfer_unit(format!("{}/upload", server.uri()));
    let stored = unit
        .transfer(&item(format!("{}/data/photo.jpg", server.uri())), "creator")
        .await
        .unwrap();

    assert_eq!(stored.permanent_url, "https://media.test/mirrors/creator/abc");
}

#[tokio::test]
async fn test_transfer_fetch_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let unit = transfer_unit(format!("{}/upload", server.uri()));
    let result = unit
        .transfer(&item(format!("{}/data/gone.jpg", server.uri())), "creator")
        .await;

    match result {
        Err(TransferError::HttpStatus { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected HttpStatus error, got {:?}", other.map(|s| s.permanent_url)),
    }
}

#[tokio::test]
async fn test_transfer_store_rejection_is_loud() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/photo.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![1, 2, 3])
                .insert_header("content-type", "image/png"),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let unit = transfer_unit(format!("{}/upload", server.uri()));
    let result = unit
        .transfer(&item(format!("{}/data/photo.jpg", server.uri())), "creator")
        .await;

    match result {
        Err(TransferError::Store {
            source: StoreError::Upload { status, body },
            ..
        }) => {
            assert_eq!(status, 500);
            assert!(body.contains("quota exceeded"));
        }
        other => panic!("expected Store error, got {:?}", other.map(|s| s.permanent_url)),
    }
}

#[tokio::test]
async fn test_classification_follows_headers_not_extension() {
    let server = MockServer::start().await;

    // A ".jpg" URL that actually serves video bytes must be routed as video
    Mock::given(method("GET"))
        .and(path("/data/clip.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0, 0, 0, 24])
                .insert_header("content-type", "video/mp4"),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains("video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "secure_url": "https://media.test/mirrors/creator/clip"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let unit = transfer_unit(format!("{}/upload", server.uri()));
    let stored = unit
        .transfer(&item(format!("{}/data/clip.jpg", server.uri())), "creator")
        .await
        .unwrap();

    assert_eq!(stored.permanent_url, "https://media.test/mirrors/creator/clip");
}

#[tokio::test]
async fn test_store_sends_bearer_token_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://media.test/mirrors/creator/x"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = StorageConfig {
        upload_url: format!("{}/upload", server.uri()),
        namespace_prefix: "mirrors".to_string(),
        api_key: Some("secret-key".to_string()),
    };
    let store = HttpMediaStore::new(&config).unwrap();

    let stored = store
        .store(
            bytes::Bytes::from_static(&[1, 2, 3]),
            StoreRequest {
                namespace: "creator".to_string(),
                kind: MimeClass::Image,
                content_type: "image/png".to_string(),
                public_id: "creator_123_abcdef".to_string(),
            },
        )
        .await
        .unwrap();

    // Falls back to the plain "url" field when "secure_url" is absent
    assert_eq!(stored.permanent_url, "https://media.test/mirrors/creator/x");
}

#[tokio::test]
async fn test_store_rejects_unusable_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok"
        })))
        .mount(&server)
        .await;

    let store =
        HttpMediaStore::new(&storage_config(format!("{}/upload", server.uri()))).unwrap();

    let result = store
        .store(
            bytes::Bytes::from_static(&[1]),
            StoreRequest {
                namespace: "creator".to_string(),
                kind: MimeClass::Raw,
                content_type: "application/octet-stream".to_string(),
                public_id: "creator_1_aaaaaa".to_string(),
            },
        )
        .await;

    assert!(matches!(result, Err(StoreError::InvalidResponse(_))));
}
