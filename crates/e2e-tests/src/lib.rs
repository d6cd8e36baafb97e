//! End-to-end test infrastructure for the enrichment pipeline.
//!
//! Provides a shared TestHarness backed by a mock catalog server plus
//! in-process blob, vector and model stand-ins whose behavior tests can
//! steer and inspect.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vandelay_client::{CatalogClient, CatalogClientConfig, CatalogSource, ClientError};
use vandelay_embeddings::{Embedding, EmbeddingError, ImageEmbedder, ModelInfo};
use vandelay_pipeline::{EnrichmentPipeline, PipelineComponents, PipelineConfig};
use vandelay_storage::{BlobStore, MemoryBlobStore, StorageError};
use vandelay_types::{RawRecord, RecordId};
use vandelay_vector::{IndexDocument, VectorError, VectorStore};

/// Manifest key used by the default pipeline config
pub const MANIFEST_KEY: &str = "met_objects.json";

/// Dimension produced by [`HashEmbedder`]
pub const TEST_EMBEDDING_DIM: usize = 8;

/// Bytes starting with this prefix make [`HashEmbedder`] fail
pub const UNDECODABLE_PREFIX: &[u8] = b"corrupt";

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Mock catalog and image host
    pub server: MockServer,
    /// Blob destination for images and the manifest
    pub blobs: MemoryBlobStore,
    /// Vector destination
    pub vectors: Arc<RecordingVectorStore>,
    /// Deterministic image model
    pub embedder: Arc<HashEmbedder>,
}

impl TestHarness {
    /// Start a mock catalog server with nothing mounted.
    pub async fn start() -> Self {
        Self {
            _temp_dir: tempfile::TempDir::new().expect("Failed to create temp dir"),
            server: MockServer::start().await,
            blobs: MemoryBlobStore::new(),
            vectors: Arc::new(RecordingVectorStore::default()),
            embedder: Arc::new(HashEmbedder::default()),
        }
    }

    pub fn temp_path(&self) -> &std::path::Path {
        self._temp_dir.path()
    }

    /// Absolute URL of `path` on the mock server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    /// Serve `GET /objects` with the given identifiers.
    pub async fn mount_listing(&self, ids: &[u64]) {
        let body = json!({"total": ids.len(), "objectIDs": ids});
        Mock::given(method("GET"))
            .and(path("/objects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Serve `GET /objects/{id}` with `body`.
    pub async fn mount_object(&self, id: u64, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/objects/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Serve `GET /objects/{id}` as the catalog does for unknown objects.
    pub async fn mount_missing(&self, id: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/objects/{}", id)))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "ObjectID not found"})),
            )
            .mount(&self.server)
            .await;
    }

    /// Serve image bytes at `image_path`.
    pub async fn mount_image(&self, image_path: &str, bytes: &[u8]) {
        Mock::given(method("GET"))
            .and(path(image_path))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.to_vec()))
            .mount(&self.server)
            .await;
    }

    /// Mount an object whose primary image is served from this server.
    pub async fn mount_object_with_image(&self, id: u64, image_path: &str, bytes: &[u8]) {
        self.mount_object(id, object_body(id, Some(&self.url(image_path)))).await;
        self.mount_image(image_path, bytes).await;
    }

    /// Catalog client pointed at the mock server, with short timeouts.
    pub fn client(&self) -> Arc<CatalogClient> {
        let config = CatalogClientConfig::new(self.server.uri()).with_timeouts(
            Duration::from_secs(5),
            Duration::from_secs(2),
            Duration::from_secs(2),
        );
        Arc::new(CatalogClient::new(config).expect("Failed to create catalog client"))
    }

    /// Components wired to the harness stand-ins.
    pub fn components(&self) -> PipelineComponents {
        let client = self.client();
        PipelineComponents {
            catalog: client.clone(),
            assets: client,
            blobs: Arc::new(self.blobs.clone()),
            embedder: self.embedder.clone(),
            vectors: self.vectors.clone(),
        }
    }

    pub fn pipeline(&self, config: PipelineConfig) -> EnrichmentPipeline {
        EnrichmentPipeline::new(self.components(), config)
    }

    /// Raw manifest bytes as written.
    pub fn manifest_bytes(&self) -> Vec<u8> {
        self.blobs
            .get(MANIFEST_KEY)
            .expect("Manifest was not written")
            .bytes
    }

    /// Parsed manifest.
    pub fn manifest(&self) -> Vec<Value> {
        match serde_json::from_slice(&self.manifest_bytes()).expect("Manifest is not JSON") {
            Value::Array(entries) => entries,
            other => panic!("Manifest is not an array: {}", other),
        }
    }

    /// Identifiers in manifest order.
    pub fn manifest_ids(&self) -> Vec<u64> {
        self.manifest()
            .iter()
            .map(|entry| entry["objectID"].as_u64().expect("objectID missing"))
            .collect()
    }
}

/// A catalog object body in the collection API's shape.
pub fn object_body(id: u64, primary_image: Option<&str>) -> Value {
    json!({
        "objectID": id,
        "isHighlight": false,
        "title": format!("Object {}", id),
        "artistDisplayName": "Unknown",
        "primaryImage": primary_image.unwrap_or(""),
        "department": "Asian Art",
    })
}

/// Deterministic embedder: folds image bytes into a fixed-size vector.
pub struct HashEmbedder {
    info: ModelInfo,
    calls: AtomicUsize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            info: ModelInfo {
                name: "hash-embedder".to_string(),
                dimension: TEST_EMBEDDING_DIM,
                image_size: 0,
            },
            calls: AtomicUsize::new(0),
        }
    }
}

impl HashEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageEmbedder for HashEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, image: &[u8]) -> Result<Embedding, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.starts_with(UNDECODABLE_PREFIX) {
            return Err(EmbeddingError::InvalidInput("cannot decode image".to_string()));
        }

        let mut values = vec![1.0f32; TEST_EMBEDDING_DIM];
        for (i, byte) in image.iter().enumerate() {
            values[i % TEST_EMBEDDING_DIM] += *byte as f32;
        }
        Ok(Embedding::new(values))
    }
}

/// Vector store that records documents by index and id.
#[derive(Default)]
pub struct RecordingVectorStore {
    docs: Mutex<BTreeMap<(String, RecordId), Vec<f32>>>,
    upserts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    failing: Mutex<HashSet<RecordId>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingVectorStore {
    /// Make upserts for `id` fail.
    pub fn fail_for(&self, id: u64) {
        self.failing.lock().unwrap().insert(RecordId::new(id));
    }

    /// Hold every upsert open for `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Document ids stored in `index_name`, ascending.
    pub fn ids(&self, index_name: &str) -> Vec<u64> {
        self.docs
            .lock()
            .unwrap()
            .keys()
            .filter(|(name, _)| name == index_name)
            .map(|(_, id)| id.get())
            .collect()
    }

    pub fn embedding(&self, index_name: &str, id: u64) -> Option<Vec<f32>> {
        self.docs
            .lock()
            .unwrap()
            .get(&(index_name.to_string(), RecordId::new(id)))
            .cloned()
    }

    /// Upsert attempts, including failed ones
    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for RecordingVectorStore {
    fn describe(&self) -> String {
        "recording".to_string()
    }

    async fn upsert(&self, index_name: &str, doc: &IndexDocument) -> Result<(), VectorError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(&doc.id) {
            return Err(VectorError::Rejected {
                status: 503,
                body: "index unavailable".to_string(),
            });
        }

        self.docs
            .lock()
            .unwrap()
            .insert((index_name.to_string(), doc.id), doc.embedding.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<(), VectorError> {
        Ok(())
    }
}

/// Blob store that rejects selected keys and forwards the rest.
pub struct FailingBlobStore {
    inner: MemoryBlobStore,
    failing_keys: HashSet<String>,
}

impl FailingBlobStore {
    pub fn new(inner: MemoryBlobStore, failing_keys: &[&str]) -> Self {
        Self {
            inner,
            failing_keys: failing_keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[async_trait]
impl BlobStore for FailingBlobStore {
    fn describe(&self) -> String {
        format!("failing({})", self.inner.describe())
    }

    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        if self.failing_keys.contains(key) {
            return Err(StorageError::Rejected {
                status: 507,
                body: "insufficient storage".to_string(),
            });
        }
        self.inner.put(key, bytes, content_type).await
    }
}

/// In-process catalog that measures how many record requests overlap.
pub struct InstrumentedCatalog {
    ids: Vec<RecordId>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: AtomicUsize,
}

impl InstrumentedCatalog {
    pub fn new(count: u64, delay: Duration) -> Self {
        Self {
            ids: (1..=count).map(RecordId::new).collect(),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for InstrumentedCatalog {
    async fn list_object_ids(&self) -> Result<Vec<RecordId>, ClientError> {
        Ok(self.ids.clone())
    }

    async fn get_object(&self, id: RecordId) -> Result<RawRecord, ClientError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        // Every third object is missing
        if id.get() % 3 == 0 {
            return Err(ClientError::Status {
                status: 404,
                url: format!("instrumented://objects/{}", id),
            });
        }

        match object_body(id.get(), None) {
            Value::Object(map) => Ok(map),
            _ => unreachable!("object_body always builds an object"),
        }
    }
}
