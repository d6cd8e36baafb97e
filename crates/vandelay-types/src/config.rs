//! Configuration loading for the Vandelay pipeline.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `<config_dir>/vandelay/config.toml`.
//! Environment variables use the `VANDELAY_` prefix and `__` between
//! section and key, e.g. `VANDELAY_CATALOG__CONCURRENCY=40`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::VandelayError;

/// Catalog API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Collection API base URL (no trailing slash)
    pub base_url: String,

    /// Timeout for the listing call (seconds)
    pub listing_timeout_secs: u64,

    /// Timeout for a single record fetch (seconds)
    pub record_timeout_secs: u64,

    /// Timeout for an image download (seconds)
    pub asset_timeout_secs: u64,

    /// Maximum simultaneous record fetches
    pub concurrency: usize,

    /// Cap on identifiers taken from the listing (0 = all)
    pub max_records: usize,

    /// Name of the identifier field in a record payload
    pub id_field: String,

    /// Name of the primary image URL field in a record payload
    pub asset_url_field: String,

    /// Accepted image URL suffix (case-insensitive)
    pub image_suffix: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: "https://collectionapi.metmuseum.org/public/collection/v1".to_string(),
            listing_timeout_secs: 60,
            record_timeout_secs: 10,
            asset_timeout_secs: 20,
            concurrency: 20,
            max_records: 0,
            id_field: "objectID".to_string(),
            asset_url_field: "primaryImage".to_string(),
            image_suffix: ".jpg".to_string(),
        }
    }
}

/// Enrichment stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichSettings {
    /// Records enriched at once. 1 processes completed fetches one at a time.
    pub concurrency: usize,

    /// Log a progress line every N completed fetches (0 = never)
    pub progress_interval: usize,

    /// Field added to a record when its image was persisted
    pub asset_key_field: String,

    /// Blob key prefix for images
    pub asset_key_prefix: String,

    /// Content type recorded for uploaded images
    pub asset_content_type: String,
}

impl Default for EnrichSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            progress_interval: 100,
            asset_key_field: "s3ImageKey".to_string(),
            asset_key_prefix: "images".to_string(),
            asset_content_type: "image/jpeg".to_string(),
        }
    }
}

/// Blob store backend selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlobBackend {
    /// Local directory (default)
    #[default]
    Fs,
    /// HTTP object endpoint accepting `PUT {endpoint}/{bucket}/{key}`
    Http,
}

/// Blob store settings (output destination).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobSettings {
    pub backend: BlobBackend,

    /// Root directory for the `fs` backend
    pub root: String,

    /// Object endpoint for the `http` backend
    pub endpoint: Option<String>,

    /// Bucket name for the `http` backend
    pub bucket: Option<String>,

    /// Bearer token (loaded from env var, not stored in config file)
    pub token: Option<String>,
}

impl Default for BlobSettings {
    fn default() -> Self {
        Self {
            backend: BlobBackend::default(),
            root: default_blob_root(),
            endpoint: None,
            bucket: None,
            token: None,
        }
    }
}

/// Manifest output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestSettings {
    /// Blob key of the manifest
    pub key: String,

    /// Sort entries by record ID before writing (false = completion order)
    pub sort_by_id: bool,
}

impl Default for ManifestSettings {
    fn default() -> Self {
        Self {
            key: "met_objects.json".to_string(),
            sort_by_id: true,
        }
    }
}

/// Vector index backend selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackend {
    /// usearch HNSW index on local disk (default)
    #[default]
    Local,
    /// Remote document index accepting `PUT {endpoint}/{index}/_doc/{id}`
    Http,
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    pub backend: VectorBackend,

    /// Name of the index embeddings are written to
    pub index_name: String,

    /// Directory holding local indexes, one subdirectory per index name
    pub index_path: String,

    /// Endpoint for the `http` backend
    pub endpoint: Option<String>,

    /// Basic auth user for the `http` backend
    pub username: Option<String>,

    /// Basic auth password (loaded from env var, not stored in config file)
    pub password: Option<String>,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            backend: VectorBackend::default(),
            index_name: "met-objects".to_string(),
            index_path: default_vector_index_path(),
            endpoint: None,
            username: None,
            password: None,
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model cache directory (None = platform cache dir)
    pub cache_dir: Option<String>,

    /// HuggingFace repository of the image model
    pub repo_id: String,

    /// Repository revision holding the safetensors weights
    pub revision: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            cache_dir: None,
            repo_id: "openai/clip-vit-base-patch32".to_string(),
            revision: "refs/pr/15".to_string(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub enrich: EnrichSettings,

    #[serde(default)]
    pub blob: BlobSettings,

    #[serde(default)]
    pub manifest: ManifestSettings,

    #[serde(default)]
    pub vector: VectorSettings,

    #[serde(default)]
    pub model: ModelSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_blob_root() -> String {
    ProjectDirs::from("", "", "vandelay")
        .map(|p| p.data_local_dir().join("output"))
        .unwrap_or_else(|| PathBuf::from("./output"))
        .to_string_lossy()
        .to_string()
}

fn default_vector_index_path() -> String {
    ProjectDirs::from("", "", "vandelay")
        .map(|p| p.data_local_dir().join("vector-index"))
        .unwrap_or_else(|| PathBuf::from("./vector-index"))
        .to_string_lossy()
        .to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            catalog: CatalogSettings::default(),
            enrich: EnrichSettings::default(),
            blob: BlobSettings::default(),
            manifest: ManifestSettings::default(),
            vector: VectorSettings::default(),
            model: ModelSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (<config_dir>/vandelay/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (VANDELAY_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, VandelayError> {
        let config_dir = ProjectDirs::from("", "", "vandelay")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| VandelayError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: VANDELAY_LOG_LEVEL, VANDELAY_CATALOG__BASE_URL, VANDELAY_BLOB__ROOT, etc.
        builder = builder.add_source(
            Environment::with_prefix("VANDELAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| VandelayError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| VandelayError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), VandelayError> {
        if self.catalog.concurrency == 0 {
            return Err(VandelayError::Config(
                "catalog.concurrency must be > 0".to_string(),
            ));
        }
        if self.enrich.concurrency == 0 {
            return Err(VandelayError::Config(
                "enrich.concurrency must be > 0".to_string(),
            ));
        }
        if self.catalog.record_timeout_secs == 0
            || self.catalog.asset_timeout_secs == 0
            || self.catalog.listing_timeout_secs == 0
        {
            return Err(VandelayError::Config(
                "catalog timeouts must be > 0".to_string(),
            ));
        }
        if self.manifest.key.trim().is_empty() {
            return Err(VandelayError::Config("manifest.key is empty".to_string()));
        }
        if self.blob.backend == BlobBackend::Http && self.blob.endpoint.is_none() {
            return Err(VandelayError::Config(
                "blob.endpoint is required for the http backend".to_string(),
            ));
        }
        if self.vector.backend == VectorBackend::Http && self.vector.endpoint.is_none() {
            return Err(VandelayError::Config(
                "vector.endpoint is required for the http backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand ~ in the blob root to the home directory
    pub fn expanded_blob_root(&self) -> PathBuf {
        expand_home(&self.blob.root)
    }

    /// Expand ~ in the vector index path to the home directory
    pub fn expanded_vector_index_path(&self) -> PathBuf {
        expand_home(&self.vector.index_path)
    }

    /// Model cache directory with ~ expanded, if one is configured
    pub fn expanded_model_cache_dir(&self) -> Option<PathBuf> {
        self.model.cache_dir.as_deref().map(expand_home)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new() {
            return home.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.catalog.concurrency, 20);
        assert_eq!(settings.catalog.record_timeout_secs, 10);
        assert_eq!(settings.catalog.asset_timeout_secs, 20);
        assert_eq!(settings.catalog.image_suffix, ".jpg");
        assert_eq!(settings.enrich.concurrency, 1);
        assert_eq!(settings.manifest.key, "met_objects.json");
        assert_eq!(settings.blob.backend, BlobBackend::Fs);
        assert_eq!(settings.vector.backend, VectorBackend::Local);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_cli_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
log_level = "debug"

[catalog]
concurrency = 5

[manifest]
key = "out/manifest.json"
"#
        )
        .unwrap();

        let settings = Settings::load(Some(&file.path().to_string_lossy())).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.catalog.concurrency, 5);
        // Untouched keys keep their defaults
        assert_eq!(settings.catalog.record_timeout_secs, 10);
        assert_eq!(settings.manifest.key, "out/manifest.json");
    }

    #[test]
    fn test_missing_cli_file_is_error() {
        let result = Settings::load(Some("/nonexistent/vandelay-config.toml"));
        assert!(matches!(result, Err(VandelayError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut settings = Settings::default();
        settings.catalog.concurrency = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.enrich.concurrency = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_http_backends_need_endpoint() {
        let mut settings = Settings::default();
        settings.blob.backend = BlobBackend::Http;
        assert!(settings.validate().is_err());
        settings.blob.endpoint = Some("http://localhost:9000".to_string());
        assert!(settings.validate().is_ok());

        settings.vector.backend = VectorBackend::Http;
        assert!(settings.validate().is_err());
        settings.vector.endpoint = Some("http://localhost:9200".to_string());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_expand_home() {
        let path = expand_home("/tmp/output");
        assert_eq!(path, PathBuf::from("/tmp/output"));
        let expanded = expand_home("~/output");
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
