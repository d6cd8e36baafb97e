//! Catalog record types.
//!
//! A record starts life as the raw JSON object returned by the catalog,
//! becomes an [`EnrichedRecord`] as soon as the fetch succeeds, and may gain
//! an asset key once its image has been persisted.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Catalog object identifier.
///
/// Always supplied by the listing endpoint, never generated locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque JSON payload returned by the catalog for one record.
pub type RawRecord = Map<String, Value>;

/// Build the blob key for a record's image (`{prefix}/{id}`).
pub fn image_key(prefix: &str, id: RecordId) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), id)
}

/// A successfully fetched record, as written to the manifest.
///
/// Serializes as the raw catalog object. The asset key, when present, is
/// stored as an extra field on that object.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    id: RecordId,
    fields: RawRecord,
    asset_key: Option<String>,
}

impl EnrichedRecord {
    /// Wrap a freshly fetched payload.
    pub fn new(id: RecordId, fields: RawRecord) -> Self {
        Self {
            id,
            fields,
            asset_key: None,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn fields(&self) -> &RawRecord {
        &self.fields
    }

    /// Blob key of the persisted image, if the asset stage succeeded.
    pub fn asset_key(&self) -> Option<&str> {
        self.asset_key.as_deref()
    }

    /// Read a string-valued field from the payload.
    pub fn string_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Attach the blob key of the persisted image under `field`.
    ///
    /// Consumes the record: a record gains an asset key at most once.
    pub fn with_asset_key(mut self, field: &str, key: impl Into<String>) -> Self {
        let key = key.into();
        self.fields
            .insert(field.to_string(), Value::String(key.clone()));
        self.asset_key = Some(key);
        self
    }
}

impl Serialize for EnrichedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Downloaded image bytes together with the key they were stored under.
///
/// Only held between the asset download and the embedding call.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub key: String,
    pub bytes: Vec<u8>,
}

impl ImageAsset {
    pub fn new(key: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            bytes,
        }
    }
}
