//! Command implementations for the `vandelay` binary.
//!
//! Handles:
//! - run: load config, wire backends, execute one enrichment pass
//! - fetch: print a single catalog object
//! - download-model: populate the model cache

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tracing::{info, warn};

use vandelay_client::{CatalogClient, CatalogClientConfig, CatalogSource};
use vandelay_embeddings::{get_or_download_model, ClipEmbedder, ImageEmbedder, ModelCache};
use vandelay_pipeline::{EnrichmentPipeline, PipelineComponents, PipelineConfig, RunStats};
use vandelay_storage::{BlobStore, FsBlobStore, HttpBlobStore, HttpBlobStoreConfig};
use vandelay_types::{BlobBackend, RecordId, Settings, VectorBackend};
use vandelay_vector::{HttpVectorStore, HttpVectorStoreConfig, LocalVectorStore, VectorStore};

use crate::cli::RunArgs;

/// Load configuration and apply the global CLI overrides.
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Apply `run` flags on top of loaded settings.
pub fn apply_run_overrides(settings: &mut Settings, args: &RunArgs) -> Result<()> {
    if let Some(n) = args.concurrency {
        settings.catalog.concurrency = n;
    }
    if let Some(n) = args.enrich_concurrency {
        settings.enrich.concurrency = n;
    }
    if let Some(n) = args.limit {
        settings.catalog.max_records = n;
    }
    if let Some(key) = &args.manifest_key {
        settings.manifest.key = key.clone();
    }
    if let Some(root) = &args.blob_root {
        settings.blob.root = root.clone();
    }
    settings.validate().context("Invalid run options")?;
    Ok(())
}

fn init_tracing(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

pub fn build_catalog_client(settings: &Settings) -> Result<CatalogClient> {
    let catalog = &settings.catalog;
    let config = CatalogClientConfig::new(catalog.base_url.clone()).with_timeouts(
        Duration::from_secs(catalog.listing_timeout_secs),
        Duration::from_secs(catalog.record_timeout_secs),
        Duration::from_secs(catalog.asset_timeout_secs),
    );
    CatalogClient::new(config).context("Failed to create catalog client")
}

pub fn build_blob_store(settings: &Settings) -> Result<Arc<dyn BlobStore>> {
    let blob = &settings.blob;
    let store: Arc<dyn BlobStore> = match blob.backend {
        BlobBackend::Fs => Arc::new(FsBlobStore::new(settings.expanded_blob_root())),
        BlobBackend::Http => {
            let Some(endpoint) = &blob.endpoint else {
                bail!("blob.endpoint is required for the http backend");
            };
            let mut config = HttpBlobStoreConfig::new(endpoint.clone());
            if let Some(bucket) = &blob.bucket {
                config = config.with_bucket(bucket.clone());
            }
            if let Some(token) = &blob.token {
                config = config.with_token(token.clone());
            }
            Arc::new(HttpBlobStore::new(config).context("Failed to create blob store")?)
        }
    };
    Ok(store)
}

pub fn build_vector_store(settings: &Settings, dimension: usize) -> Result<Arc<dyn VectorStore>> {
    let vector = &settings.vector;
    let store: Arc<dyn VectorStore> = match vector.backend {
        VectorBackend::Local => Arc::new(LocalVectorStore::new(
            settings.expanded_vector_index_path(),
            dimension,
        )),
        VectorBackend::Http => {
            let Some(endpoint) = &vector.endpoint else {
                bail!("vector.endpoint is required for the http backend");
            };
            let mut config = HttpVectorStoreConfig::new(endpoint.clone());
            if let Some(username) = &vector.username {
                config = config.with_credentials(
                    username.clone(),
                    vector.password.clone().unwrap_or_default(),
                );
            }
            Arc::new(HttpVectorStore::new(config).context("Failed to create vector store")?)
        }
    };
    Ok(store)
}

pub fn model_cache(settings: &Settings) -> ModelCache {
    let mut cache = ModelCache::default();
    if let Some(dir) = settings.expanded_model_cache_dir() {
        cache.cache_dir = dir;
    }
    cache.repo_id = settings.model.repo_id.clone();
    cache.revision = settings.model.revision.clone();
    cache
}

async fn load_embedder(settings: &Settings) -> Result<Arc<dyn ImageEmbedder>> {
    let cache = model_cache(settings);
    let embedder = tokio::task::spawn_blocking(move || ClipEmbedder::load(&cache))
        .await
        .context("Model loading task failed")?
        .context("Failed to load embedding model")?;
    Ok(Arc::new(embedder))
}

/// Execute one enrichment pass.
///
/// 1. Load configuration (defaults -> file -> env -> CLI)
/// 2. Load the embedding model once
/// 3. Wire catalog, blob and vector backends
/// 4. Run the pipeline, abandoning it on Ctrl-C
pub async fn run_enrichment(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    args: &RunArgs,
) -> Result<RunStats> {
    let mut settings = load_settings(config_path, log_level_override)?;
    apply_run_overrides(&mut settings, args)?;
    init_tracing(&settings)?;

    info!(catalog = %settings.catalog.base_url, "Vandelay enrichment starting...");

    let embedder = load_embedder(&settings).await?;
    let client = Arc::new(build_catalog_client(&settings)?);
    let blobs = build_blob_store(&settings)?;
    let vectors = build_vector_store(&settings, embedder.info().dimension)?;

    info!(
        blobs = %blobs.describe(),
        vectors = %vectors.describe(),
        index = %settings.vector.index_name,
        "Backends ready"
    );

    let pipeline = EnrichmentPipeline::new(
        PipelineComponents {
            catalog: client.clone(),
            assets: client,
            blobs,
            embedder,
            vectors,
        },
        PipelineConfig::from_settings(&settings),
    );

    let interrupted = async {
        match signal::ctrl_c().await {
            Ok(()) => warn!("Received Ctrl+C, stopping run"),
            Err(e) => {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    let stats = pipeline
        .run_until(interrupted)
        .await
        .context("Enrichment run failed")?;
    Ok(stats)
}

/// Fetch one object and print it to stdout.
pub async fn fetch_record(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    id: u64,
) -> Result<()> {
    let settings = load_settings(config_path, log_level_override)?;
    init_tracing(&settings)?;

    let client = build_catalog_client(&settings)?;
    let record = client
        .get_object(RecordId::new(id))
        .await
        .with_context(|| format!("Failed to fetch object {}", id))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Download model weights so later runs start offline.
pub async fn download_model(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<()> {
    let settings = load_settings(config_path, log_level_override)?;
    init_tracing(&settings)?;

    let cache = model_cache(&settings);
    let paths = tokio::task::spawn_blocking(move || get_or_download_model(&cache))
        .await
        .context("Model download task failed")?
        .context("Failed to download model")?;

    println!("Model ready: {}", paths.weights.display());
    Ok(())
}
