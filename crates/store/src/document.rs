//! On-disk document format.
//!
//! The snapshot is a single JSON object. The reserved `_schema` key carries
//! the format version; every other key that doesn't start with an underscore
//! is a collection name:
//!
//! ```json
//! {
//!     "_schema": { "version": 1 },
//!     "Marvel": { "type": "movie", "items": [{ "title": "Iron Man", "year": 2008, "found": false }] }
//! }
//! ```

use crate::error::{ErrorKind, Result};
use crate::models::Collection;
use exn::ResultExt;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Version written by this build, and the newest version it can read.
pub const SCHEMA_VERSION: u32 = 1;
const SCHEMA_KEY: &str = "_schema";
const RESERVED_PREFIX: char = '_';

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub version: u32,
}
impl Default for Schema {
    fn default() -> Self {
        Self { version: SCHEMA_VERSION }
    }
}

/// Everything the store persists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    pub schema: Schema,
    pub collections: BTreeMap<String, Collection>,
}

/// Collection names share a namespace with metadata keys.
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.collections.len() + 1))?;
        map.serialize_entry(SCHEMA_KEY, &self.schema)?;
        for (name, collection) in &self.collections {
            map.serialize_entry(name, collection)?;
        }
        map.end()
    }
}

impl Document {
    /// Parses a snapshot. Unknown reserved keys are ignored, a missing
    /// `_schema` is read as version 1, and anything else that doesn't fit is
    /// reported as [`ErrorKind::Corrupt`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let root: Map<String, Value> =
            serde_json::from_slice(bytes).or_raise(|| ErrorKind::Corrupt("not a JSON object".to_string()))?;
        let mut document = Self::default();
        for (key, value) in root {
            if key == SCHEMA_KEY {
                let schema: Schema =
                    serde_json::from_value(value).or_raise(|| ErrorKind::Corrupt("invalid schema block".to_string()))?;
                if schema.version > SCHEMA_VERSION {
                    exn::bail!(ErrorKind::Corrupt(format!("unsupported schema version {}", schema.version)));
                }
                document.schema = schema;
                continue;
            }
            if is_reserved(&key) {
                continue;
            }
            let collection: Collection = serde_json::from_value(value)
                .or_raise(|| ErrorKind::Corrupt(format!("invalid collection '{key}'")))?;
            document.collections.insert(key, collection);
        }
        // Older documents are upgraded in memory; written back on next snapshot.
        document.schema.version = SCHEMA_VERSION;
        Ok(document)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).or_raise(|| ErrorKind::Serialization)
    }
}
