//! # vandelay-pipeline
//!
//! Concurrent catalog enrichment.
//!
//! ## Key Components
//!
//! - [`ConcurrencyGate`]: caps simultaneous catalog record requests
//! - [`RecordFetcher`]: fetches one record through the gate
//! - [`AssetFetcher`]: downloads a record's image and stores it as a blob
//! - [`EmbeddingStage`]: runs the image model on the blocking pool
//! - [`IndexPersister`]: upserts embeddings into the vector store
//! - [`ManifestWriter`]: collects enriched records into the run manifest
//! - [`EnrichmentPipeline`]: orchestrates a full pass
//!
//! ## Failure model
//!
//! Only a listing failure or a manifest write failure aborts a run. A record
//! whose fetch fails is dropped; a record whose later stages fail is kept
//! with whatever it gained before the failure.

pub mod asset;
pub mod embed;
pub mod error;
pub mod fetcher;
pub mod gate;
pub mod manifest;
pub mod persist;
pub mod pipeline;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use asset::{accepts_url, AssetFetcher};
pub use embed::EmbeddingStage;
pub use error::PipelineError;
pub use fetcher::RecordFetcher;
pub use gate::ConcurrencyGate;
pub use manifest::ManifestWriter;
pub use persist::IndexPersister;
pub use pipeline::{EnrichmentPipeline, PipelineComponents, PipelineConfig};
pub use stats::{RecordOutcome, RunStats};
