//! # vandelay-types
//!
//! Shared domain types for the Vandelay catalog enrichment pipeline.
//!
//! This crate defines the data that flows between the pipeline stages:
//! - Record identifiers and raw catalog payloads
//! - Enriched records as they appear in the manifest
//! - Image assets held between download and embedding
//! - Settings: layered configuration for every stage
//!
//! ## Usage
//!
//! ```rust
//! use vandelay_types::{EnrichedRecord, RecordId};
//!
//! let record = EnrichedRecord::new(RecordId::new(42), serde_json::Map::new());
//! assert_eq!(record.id().get(), 42);
//! ```

pub mod config;
pub mod error;
pub mod record;

pub use config::{
    BlobBackend, BlobSettings, CatalogSettings, EnrichSettings, ManifestSettings, ModelSettings,
    Settings, VectorBackend, VectorSettings,
};
pub use error::VandelayError;
pub use record::{image_key, EnrichedRecord, ImageAsset, RawRecord, RecordId};
