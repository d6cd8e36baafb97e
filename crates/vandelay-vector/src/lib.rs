//! # vandelay-vector
//!
//! Vector index backends for catalog image embeddings.
//!
//! Documents are keyed by record ID and written with upsert semantics:
//! re-indexing a record replaces its previous vector.
//!
//! ## Backends
//! - [`LocalVectorStore`]: usearch HNSW indexes persisted under a directory,
//!   one subdirectory per index name
//! - [`HttpVectorStore`]: document-store style `PUT {index}/_doc/{id}` endpoint

pub mod error;
pub mod hnsw;
pub mod http;
pub mod local;
pub mod store;

pub use error::VectorError;
pub use hnsw::{HnswConfig, HnswIndex};
pub use http::{HttpVectorStore, HttpVectorStoreConfig};
pub use local::LocalVectorStore;
pub use store::{validate_index_name, IndexDocument, VectorStore};
