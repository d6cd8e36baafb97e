//! Blob storage for the Vandelay pipeline.
//!
//! Provides one `put(key, bytes, content_type)` abstraction with three backends:
//! - [`FsBlobStore`]: files under a local root directory (default output)
//! - [`HttpBlobStore`]: objects PUT to an HTTP endpoint (S3-compatible gateways, GCS XML API)
//! - [`MemoryBlobStore`]: in-process map, for tests and dry runs
//!
//! Every write replaces whatever was stored under the key before, which is
//! what makes reruns of the pipeline safe.

pub mod blob;
pub mod error;
pub mod fs;
pub mod http;
pub mod memory;

pub use blob::{validate_key, BlobStore, CONTENT_TYPE_JSON};
pub use error::StorageError;
pub use fs::FsBlobStore;
pub use http::{HttpBlobStore, HttpBlobStoreConfig};
pub use memory::{MemoryBlobStore, StoredBlob};
