//! Catalog client for the Vandelay pipeline.
//!
//! Talks to a collection API shaped like the Met Museum public API:
//! - `GET {base}/objects` lists every object ID
//! - `GET {base}/objects/{id}` returns one object as JSON
//!
//! The same client downloads primary images. The [`CatalogSource`] and
//! [`AssetSource`] traits are the seams the pipeline is written against, so
//! tests can substitute instrumented transports.

pub mod client;
pub mod error;
pub mod source;

pub use client::{CatalogClient, CatalogClientConfig, DEFAULT_BASE_URL};
pub use error::ClientError;
pub use source::{AssetSource, CatalogSource};
