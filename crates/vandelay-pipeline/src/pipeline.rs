//! Enrichment run orchestration.
//!
//! One run is: list identifiers, fetch records through the concurrency
//! gate, enrich each completed record (asset, embedding, index), then write
//! the manifest. The fetch fan-out and the enrichment loop run as two
//! futures joined in the calling task and connected by a bounded channel.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use vandelay_client::{AssetSource, CatalogSource};
use vandelay_embeddings::ImageEmbedder;
use vandelay_storage::BlobStore;
use vandelay_types::{EnrichedRecord, RecordId, Settings};
use vandelay_vector::VectorStore;

use crate::asset::AssetFetcher;
use crate::embed::EmbeddingStage;
use crate::error::PipelineError;
use crate::fetcher::RecordFetcher;
use crate::gate::ConcurrencyGate;
use crate::manifest::ManifestWriter;
use crate::persist::IndexPersister;
use crate::stats::{RecordOutcome, RunStats};

/// Configuration for an enrichment run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Gate capacity for record fetches
    pub fetch_concurrency: usize,
    /// Records enriched at once (1 = strictly one after another)
    pub enrich_concurrency: usize,
    /// Log progress every N completed fetches (0 = never)
    pub progress_interval: usize,
    /// Cap on identifiers taken from the listing (0 = unlimited)
    pub max_records: usize,
    pub id_field: String,
    pub asset_url_field: String,
    pub asset_key_field: String,
    pub asset_key_prefix: String,
    pub image_suffix: String,
    pub asset_content_type: String,
    pub index_name: String,
    pub manifest_key: String,
    pub sort_manifest: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            fetch_concurrency: settings.catalog.concurrency,
            enrich_concurrency: settings.enrich.concurrency,
            progress_interval: settings.enrich.progress_interval,
            max_records: settings.catalog.max_records,
            id_field: settings.catalog.id_field.clone(),
            asset_url_field: settings.catalog.asset_url_field.clone(),
            asset_key_field: settings.enrich.asset_key_field.clone(),
            asset_key_prefix: settings.enrich.asset_key_prefix.clone(),
            image_suffix: settings.catalog.image_suffix.clone(),
            asset_content_type: settings.enrich.asset_content_type.clone(),
            index_name: settings.vector.index_name.clone(),
            manifest_key: settings.manifest.key.clone(),
            sort_manifest: settings.manifest.sort_by_id,
        }
    }

    pub fn with_fetch_concurrency(mut self, n: usize) -> Self {
        self.fetch_concurrency = n;
        self
    }

    pub fn with_enrich_concurrency(mut self, n: usize) -> Self {
        self.enrich_concurrency = n;
        self
    }

    pub fn with_max_records(mut self, n: usize) -> Self {
        self.max_records = n;
        self
    }

    pub fn with_manifest_key(mut self, key: impl Into<String>) -> Self {
        self.manifest_key = key.into();
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.fetch_concurrency == 0 {
            return Err(PipelineError::Config(
                "fetch concurrency must be at least 1".to_string(),
            ));
        }
        if self.enrich_concurrency == 0 {
            return Err(PipelineError::Config(
                "enrich concurrency must be at least 1".to_string(),
            ));
        }
        if self.manifest_key.trim().is_empty() {
            return Err(PipelineError::Config("manifest key is empty".to_string()));
        }
        Ok(())
    }
}

/// External collaborators of a run.
pub struct PipelineComponents {
    pub catalog: Arc<dyn CatalogSource>,
    pub assets: Arc<dyn AssetSource>,
    pub blobs: Arc<dyn BlobStore>,
    pub embedder: Arc<dyn ImageEmbedder>,
    pub vectors: Arc<dyn VectorStore>,
}

/// Catalog enrichment pipeline.
pub struct EnrichmentPipeline {
    components: PipelineComponents,
    config: PipelineConfig,
}

impl EnrichmentPipeline {
    pub fn new(components: PipelineComponents, config: PipelineConfig) -> Self {
        Self { components, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one full pass.
    ///
    /// Fails only when the listing or the manifest write fails. Everything
    /// else is absorbed per record and reflected in the returned stats.
    pub async fn run(&self) -> Result<RunStats, PipelineError> {
        self.config.validate()?;
        let mut stats = RunStats::start();

        let listed = match self.components.catalog.list_object_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "Failed to list catalog objects");
                return Err(e.into());
            }
        };
        stats.listed = listed.len();

        let (mut ids, duplicates) = dedupe(listed);
        if duplicates > 0 {
            warn!(duplicates, "Listing contained repeated identifiers; keeping first occurrence");
        }
        stats.duplicates = duplicates;

        if self.config.max_records > 0 && ids.len() > self.config.max_records {
            info!(limit = self.config.max_records, available = ids.len(), "Limiting run");
            ids.truncate(self.config.max_records);
        }
        stats.scheduled = ids.len();

        info!(
            objects = ids.len(),
            fetch_concurrency = self.config.fetch_concurrency,
            enrich_concurrency = self.config.enrich_concurrency,
            "Starting enrichment run"
        );

        let fetcher = RecordFetcher::new(
            self.components.catalog.clone(),
            ConcurrencyGate::new(self.config.fetch_concurrency)?,
            self.config.id_field.clone(),
        )
        .with_asset_key_field(self.config.asset_key_field.clone());
        let stages = EnrichStages {
            assets: AssetFetcher::new(
                self.components.assets.clone(),
                self.components.blobs.clone(),
                self.config.image_suffix.clone(),
                self.config.asset_key_prefix.clone(),
                self.config.asset_content_type.clone(),
            ),
            embedding: EmbeddingStage::new(self.components.embedder.clone()),
            persister: IndexPersister::new(
                self.components.vectors.clone(),
                self.config.index_name.clone(),
            ),
            asset_url_field: &self.config.asset_url_field,
            asset_key_field: &self.config.asset_key_field,
        };

        // Queue enough fetches that the gate, not the stream, is the bound
        let in_flight = self.config.fetch_concurrency.saturating_mul(2);
        let (tx, rx) = mpsc::channel::<EnrichedRecord>(in_flight);
        let progress_interval = self.config.progress_interval;

        let producer = async {
            let mut tx = tx;
            let mut fetches = futures::stream::iter(ids)
                .map(|id| fetcher.fetch(id))
                .buffer_unordered(in_flight);

            let (mut completed, mut fetched, mut failed) = (0usize, 0usize, 0usize);
            while let Some(result) = fetches.next().await {
                completed += 1;
                if progress_interval > 0 && completed % progress_interval == 0 {
                    info!(completed, "Fetched {} objects", completed);
                }

                match result {
                    Some(record) => {
                        fetched += 1;
                        if tx.send(record).await.is_err() {
                            warn!("Enrichment loop stopped; abandoning remaining fetches");
                            break;
                        }
                    }
                    None => failed += 1,
                }
            }
            (fetched, failed)
        };

        let consumer = async {
            let mut manifest = ManifestWriter::new();
            let mut outcomes = Vec::new();
            let mut enriched = rx
                .map(|record| stages.enrich(record))
                .buffer_unordered(self.config.enrich_concurrency);

            while let Some((record, outcome)) = enriched.next().await {
                outcomes.push(outcome);
                manifest.push(record);
            }
            (manifest, outcomes)
        };

        let ((fetched, fetch_failed), (manifest, outcomes)) = tokio::join!(producer, consumer);
        stats.fetched = fetched;
        stats.fetch_failed = fetch_failed;
        for outcome in outcomes {
            stats.record(outcome);
        }

        stages.persister.flush().await;

        let written = manifest
            .write(
                self.components.blobs.as_ref(),
                &self.config.manifest_key,
                self.config.sort_manifest,
            )
            .await
            .inspect_err(|e| {
                error!(key = %self.config.manifest_key, error = %e, "Failed to write manifest")
            })?;
        stats.manifest_entries = written;
        stats.finish();

        info!(
            listed = stats.listed,
            fetched = stats.fetched,
            fetch_failed = stats.fetch_failed,
            assets = stats.assets_persisted,
            indexed = stats.indexed,
            manifest_entries = stats.manifest_entries,
            elapsed_ms = stats.elapsed_ms().unwrap_or_default(),
            "Enrichment run complete"
        );
        Ok(stats)
    }

    /// Execute one full pass, abandoning it when `shutdown` completes first.
    ///
    /// On shutdown the vector store is flushed so embeddings indexed so far
    /// survive. No manifest is written for an interrupted run.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<RunStats, PipelineError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.run() => result,
            () = shutdown => {
                warn!("Shutdown requested, abandoning run");
                IndexPersister::new(self.components.vectors.clone(), self.config.index_name.clone())
                    .flush()
                    .await;
                Err(PipelineError::Interrupted)
            }
        }
    }
}

/// Per-record stages after a successful fetch.
struct EnrichStages<'a> {
    assets: AssetFetcher,
    embedding: EmbeddingStage,
    persister: IndexPersister,
    asset_url_field: &'a str,
    asset_key_field: &'a str,
}

impl EnrichStages<'_> {
    async fn enrich(&self, record: EnrichedRecord) -> (EnrichedRecord, RecordOutcome) {
        let id = record.id();

        let asset = self
            .assets
            .fetch(id, record.string_field(self.asset_url_field))
            .await;
        let Some(asset) = asset else {
            return (record, RecordOutcome::AssetSkipped);
        };

        let record = record.with_asset_key(self.asset_key_field, asset.key);
        let Some(embedding) = self.embedding.generate(id, asset.bytes).await else {
            return (record, RecordOutcome::EmbedFailed);
        };

        let outcome = if self.persister.persist(id, &embedding).await {
            RecordOutcome::Indexed
        } else {
            RecordOutcome::IndexFailed
        };
        debug!(record_id = %id, outcome = ?outcome, "Enriched record");
        (record, outcome)
    }
}

/// Drop repeated identifiers, keeping first occurrences in listing order.
fn dedupe(ids: Vec<RecordId>) -> (Vec<RecordId>, usize) {
    let total = ids.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<RecordId> = ids.into_iter().filter(|id| seen.insert(*id)).collect();
    let duplicates = total - unique.len();
    (unique, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::test_support::{
        raw, record_with_image, EchoAssets, RecordingVectors, StubCatalog, StubEmbedder,
    };
    use tempfile::TempDir;
    use vandelay_storage::MemoryBlobStore;
    use vandelay_vector::LocalVectorStore;

    struct Fixture {
        blobs: MemoryBlobStore,
        vectors: Arc<RecordingVectors>,
        embedder: Arc<StubEmbedder>,
        assets: Arc<EchoAssets>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                blobs: MemoryBlobStore::new(),
                vectors: Arc::new(RecordingVectors::default()),
                embedder: Arc::new(StubEmbedder::default()),
                assets: Arc::new(EchoAssets::default()),
            }
        }

        fn pipeline(&self, catalog: StubCatalog, config: PipelineConfig) -> EnrichmentPipeline {
            EnrichmentPipeline::new(
                PipelineComponents {
                    catalog: Arc::new(catalog),
                    assets: self.assets.clone(),
                    blobs: Arc::new(self.blobs.clone()),
                    embedder: self.embedder.clone(),
                    vectors: self.vectors.clone(),
                },
                config,
            )
        }

        fn manifest(&self) -> serde_json::Value {
            let blob = self.blobs.get("met_objects.json").unwrap();
            serde_json::from_slice(&blob.bytes).unwrap()
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let ids = [3, 1, 3, 2, 1].map(RecordId::new).to_vec();
        let (unique, duplicates) = dedupe(ids);
        assert_eq!(unique, [3, 1, 2].map(RecordId::new).to_vec());
        assert_eq!(duplicates, 2);
    }

    #[test]
    fn test_config_validation() {
        assert!(PipelineConfig::default().validate().is_ok());
        assert!(PipelineConfig::default()
            .with_fetch_concurrency(0)
            .validate()
            .is_err());
        assert!(PipelineConfig::default()
            .with_enrich_concurrency(0)
            .validate()
            .is_err());
        assert!(PipelineConfig::default()
            .with_manifest_key(" ")
            .validate()
            .is_err());
    }

    #[tokio::test]
    async fn test_run_enriches_and_writes_manifest() {
        let fixture = Fixture::new();
        let catalog = StubCatalog::default()
            .with_record(1, record_with_image(1, "https://img/1.png"))
            .with_missing(2)
            .with_record(3, record_with_image(3, "https://img/3.jpg"));

        let stats = fixture
            .pipeline(catalog, PipelineConfig::default())
            .run()
            .await
            .unwrap();

        assert_eq!(stats.listed, 3);
        assert_eq!(stats.fetched, 2);
        assert_eq!(stats.fetch_failed, 1);
        assert_eq!(stats.assets_persisted, 1);
        assert_eq!(stats.assets_skipped, 1);
        assert_eq!(stats.indexed, 1);
        assert_eq!(stats.manifest_entries, 2);

        let manifest = fixture.manifest();
        assert_eq!(manifest[0]["objectID"], 1);
        assert!(manifest[0].get("s3ImageKey").is_none());
        assert_eq!(manifest[1]["s3ImageKey"], "images/3");

        assert_eq!(fixture.vectors.ids(), vec![RecordId::new(3)]);
        assert_eq!(fixture.vectors.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_catalog_asset_key_never_reaches_manifest() {
        let fixture = Fixture::new();
        let catalog = StubCatalog::default()
            .with_record(
                1,
                raw(serde_json::json!({
                    "objectID": 1,
                    "primaryImage": "https://img/1.png",
                    "s3ImageKey": "images/999"
                })),
            )
            .with_record(
                2,
                raw(serde_json::json!({
                    "objectID": 2,
                    "primaryImage": "https://img/2.jpg",
                    "s3ImageKey": "images/999"
                })),
            );

        let stats = fixture
            .pipeline(catalog, PipelineConfig::default())
            .run()
            .await
            .unwrap();

        assert_eq!(stats.assets_persisted, 1);
        assert_eq!(stats.assets_skipped, 1);

        let manifest = fixture.manifest();
        let by_id = |id: u64| {
            manifest
                .as_array()
                .unwrap()
                .iter()
                .find(|r| r["objectID"] == id)
                .cloned()
                .unwrap()
        };
        assert!(by_id(1).get("s3ImageKey").is_none());
        assert_eq!(by_id(2)["s3ImageKey"], "images/2");
    }

    #[tokio::test]
    async fn test_duplicates_and_limit() {
        let fixture = Fixture::new();
        let mut catalog = StubCatalog::default();
        for id in [5, 6, 7] {
            catalog = catalog.with_record(id, record_with_image(id, "https://img/x.png"));
        }
        catalog.ids.push(RecordId::new(5));

        let stats = fixture
            .pipeline(catalog, PipelineConfig::default().with_max_records(2))
            .run()
            .await
            .unwrap();

        assert_eq!(stats.listed, 4);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.scheduled, 2);
        assert_eq!(stats.manifest_entries, 2);

        let ids: Vec<u64> = fixture
            .manifest()
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["objectID"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![5, 6]);
    }

    #[tokio::test]
    async fn test_interrupted_run_keeps_indexed_embeddings() {
        let temp = TempDir::new().unwrap();
        let vectors = Arc::new(LocalVectorStore::new(temp.path(), 4));
        let blobs = MemoryBlobStore::new();
        let catalog = StubCatalog::default()
            .with_record(1, record_with_image(1, "https://img/1.jpg"))
            .with_record(2, record_with_image(2, "https://img/2.jpg"))
            .with_pending(3);

        let pipeline = EnrichmentPipeline::new(
            PipelineComponents {
                catalog: Arc::new(catalog),
                assets: Arc::new(EchoAssets::default()),
                blobs: Arc::new(blobs.clone()),
                embedder: Arc::new(StubEmbedder::default()),
                vectors: vectors.clone(),
            },
            PipelineConfig::default(),
        );

        // Record 3 never completes, so the run stalls once 1 and 2 are indexed
        let indexed = async {
            while !matches!(vectors.count("met-objects").await, Ok(2)) {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        };
        let result = pipeline.run_until(indexed).await;

        assert!(matches!(result, Err(PipelineError::Interrupted)));
        assert!(blobs.get("met_objects.json").is_none());
        assert!(temp.path().join("met-objects").join("hnsw.usearch").exists());

        let reopened = LocalVectorStore::new(temp.path(), 4);
        assert_eq!(reopened.count("met-objects").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_run_until_completes_when_not_interrupted() {
        let fixture = Fixture::new();
        let catalog =
            StubCatalog::default().with_record(1, record_with_image(1, "https://img/1.jpg"));

        let stats = fixture
            .pipeline(catalog, PipelineConfig::default())
            .run_until(futures::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.indexed, 1);
        assert_eq!(stats.manifest_entries, 1);
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let fixture = Fixture::new();
        let catalog = StubCatalog {
            fail_listing: true,
            ..Default::default()
        };

        let result = fixture.pipeline(catalog, PipelineConfig::default()).run().await;
        assert!(matches!(result, Err(PipelineError::Listing(_))));
        assert!(fixture.blobs.is_empty());
    }

    #[tokio::test]
    async fn test_empty_listing_writes_empty_manifest() {
        let fixture = Fixture::new();
        let stats = fixture
            .pipeline(StubCatalog::default(), PipelineConfig::default())
            .run()
            .await
            .unwrap();

        assert_eq!(stats.manifest_entries, 0);
        assert_eq!(fixture.manifest(), serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_parallel_enrichment() {
        let fixture = Fixture::new();
        let mut catalog = StubCatalog::default();
        for id in 1..=20 {
            let url = format!("https://img/{id}.jpg");
            catalog = catalog.with_record(id, record_with_image(id, &url));
        }

        let stats = fixture
            .pipeline(catalog, PipelineConfig::default().with_enrich_concurrency(4))
            .run()
            .await
            .unwrap();

        assert_eq!(stats.indexed, 20);
        assert_eq!(fixture.vectors.ids().len(), 20);
        assert_eq!(fixture.blobs.len(), 21);
    }
}
