//! Error path E2E tests.
//!
//! Listing and manifest failures abort the run. Every other failure is
//! confined to the record it happened on.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use e2e_tests::{object_body, FailingBlobStore, TestHarness, MANIFEST_KEY, UNDECODABLE_PREFIX};
use vandelay_pipeline::{EnrichmentPipeline, PipelineConfig, PipelineError};

#[tokio::test]
async fn test_listing_failure_aborts_without_output() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path("/objects"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&harness.server)
        .await;

    let result = harness.pipeline(PipelineConfig::default()).run().await;

    assert!(matches!(result, Err(PipelineError::Listing(_))));
    assert!(harness.blobs.is_empty());
    assert_eq!(harness.vectors.upserts(), 0);
}

#[tokio::test]
async fn test_malformed_listing_aborts() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .and(path("/objects"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&harness.server)
        .await;

    let result = harness.pipeline(PipelineConfig::default()).run().await;
    assert!(matches!(result, Err(PipelineError::Listing(_))));
}

#[tokio::test]
async fn test_null_listing_writes_empty_manifest() {
    let harness = TestHarness::start().await;
    let body = json!({"total": 0, "objectIDs": null});
    Mock::given(method("GET"))
        .and(path("/objects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&harness.server)
        .await;

    let stats = harness
        .pipeline(PipelineConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.listed, 0);
    assert_eq!(harness.manifest_bytes(), b"[]".to_vec());
}

#[tokio::test]
async fn test_manifest_failure_is_fatal_but_assets_remain() {
    let harness = TestHarness::start().await;
    harness.mount_listing(&[3]).await;
    harness
        .mount_object_with_image(3, "/images/3.jpg", b"jpeg")
        .await;

    let mut components = harness.components();
    components.blobs = Arc::new(FailingBlobStore::new(harness.blobs.clone(), &[MANIFEST_KEY]));
    let result = EnrichmentPipeline::new(components, PipelineConfig::default())
        .run()
        .await;

    assert!(matches!(result, Err(PipelineError::Manifest(_))));
    // No rollback of per-record outputs
    assert!(harness.blobs.contains("images/3"));
    assert!(!harness.blobs.contains(MANIFEST_KEY));
    assert_eq!(harness.vectors.ids("met-objects"), vec![3]);
}

#[tokio::test]
async fn test_embedding_failure_keeps_asset_key_without_index_entry() {
    let harness = TestHarness::start().await;
    harness.mount_listing(&[4]).await;
    let mut bytes = UNDECODABLE_PREFIX.to_vec();
    bytes.extend_from_slice(b"-truncated");
    harness
        .mount_object_with_image(4, "/images/4.jpg", &bytes)
        .await;

    let stats = harness
        .pipeline(PipelineConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(harness.manifest()[0]["s3ImageKey"], json!("images/4"));
    assert!(harness.blobs.contains("images/4"));
    assert_eq!(harness.vectors.upserts(), 0);
    assert_eq!(stats.embed_failed, 1);
}

#[tokio::test]
async fn test_index_failure_is_swallowed() {
    let harness = TestHarness::start().await;
    harness.mount_listing(&[5, 6]).await;
    harness.mount_object_with_image(5, "/images/5.jpg", b"five").await;
    harness.mount_object_with_image(6, "/images/6.jpg", b"six").await;
    harness.vectors.fail_for(5);

    let stats = harness
        .pipeline(PipelineConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(harness.manifest_ids(), vec![5, 6]);
    assert_eq!(harness.manifest()[0]["s3ImageKey"], json!("images/5"));
    assert_eq!(harness.vectors.ids("met-objects"), vec![6]);
    assert_eq!(stats.index_failed, 1);
    assert_eq!(stats.indexed, 1);
}

#[tokio::test]
async fn test_unaccepted_suffix_skips_download_and_embedding() {
    let harness = TestHarness::start().await;
    harness.mount_listing(&[1, 2]).await;
    harness
        .mount_object(1, object_body(1, Some(&harness.url("/images/1.tif"))))
        .await;
    harness.mount_object(2, object_body(2, None)).await;

    harness
        .pipeline(PipelineConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(harness.manifest_ids(), vec![1, 2]);
    assert!(harness.manifest().iter().all(|r| r.get("s3ImageKey").is_none()));
    assert_eq!(harness.embedder.calls(), 0);

    // Only the listing and the two object requests reached the server
    let requests = harness.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_asset_download_failure_keeps_record() {
    let harness = TestHarness::start().await;
    harness.mount_listing(&[9]).await;
    harness
        .mount_object(9, object_body(9, Some(&harness.url("/images/9.jpg"))))
        .await;
    Mock::given(method("GET"))
        .and(path("/images/9.jpg"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&harness.server)
        .await;

    let stats = harness
        .pipeline(PipelineConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(harness.manifest_ids(), vec![9]);
    assert!(harness.manifest()[0].get("s3ImageKey").is_none());
    assert_eq!(harness.embedder.calls(), 0);
    assert_eq!(stats.assets_skipped, 1);
}

#[tokio::test]
async fn test_fetch_failures_are_excluded() {
    let harness = TestHarness::start().await;
    harness.mount_listing(&[10, 11, 12, 13]).await;
    harness.mount_object(10, object_body(10, None)).await;
    // Server error
    Mock::given(method("GET"))
        .and(path("/objects/11"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&harness.server)
        .await;
    // Slower than the record timeout
    Mock::given(method("GET"))
        .and(path("/objects/12"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(object_body(12, None))
                .set_delay(Duration::from_secs(4)),
        )
        .mount(&harness.server)
        .await;
    // Not a JSON object
    Mock::given(method("GET"))
        .and(path("/objects/13"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["unexpected"])))
        .mount(&harness.server)
        .await;

    let stats = harness
        .pipeline(PipelineConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(harness.manifest_ids(), vec![10]);
    assert_eq!(stats.fetched, 1);
    assert_eq!(stats.fetch_failed, 3);
}

#[tokio::test]
async fn test_duplicate_listing_ids_appear_once() {
    let harness = TestHarness::start().await;
    harness.mount_listing(&[21, 22, 21, 21]).await;
    harness.mount_object(21, object_body(21, None)).await;
    harness.mount_object(22, object_body(22, None)).await;

    let stats = harness
        .pipeline(PipelineConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(harness.manifest_ids(), vec![21, 22]);
    assert_eq!(stats.duplicates, 2);
}
