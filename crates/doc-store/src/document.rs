use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::DocumentId;

/// Revision number of a stored document, used for optimistic concurrency control.
///
/// A freshly inserted document is at revision 1; every successful write
/// (replace or counter update) increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(i64);

impl Revision {
    /// Creates a revision from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Revision of a document that has not been stored yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Revision assigned on insert.
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Revision {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A stored JSON document together with its storage metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,

    /// Collection the document belongs to (e.g. "orders", "products").
    pub collection: String,

    /// Revision after the last successful write.
    pub revision: Revision,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// The document payload.
    pub body: serde_json::Value,
}

impl Document {
    /// Creates an unsaved document from a raw JSON body.
    pub fn new(
        collection: impl Into<String>,
        id: impl Into<DocumentId>,
        body: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            collection: collection.into(),
            revision: Revision::initial(),
            created_at: now,
            updated_at: now,
            body,
        }
    }

    /// Creates an unsaved document by serializing `value`.
    pub fn from_value<T: Serialize>(
        collection: impl Into<String>,
        id: impl Into<DocumentId>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(collection, id, serde_json::to_value(value)?))
    }

    /// Deserializes the body into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }

    /// Replaces the body, keeping identity and revision.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }

    /// Looks up a nested field by dot-separated path (e.g. `"vendor_info.tax_id"`).
    pub fn field(&self, path: &str) -> Option<&serde_json::Value> {
        self.body.pointer(&pointer(path))
    }
}

/// Converts a dot-separated field path into a JSON pointer.
pub(crate) fn pointer(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('.') {
        out.push('/');
        out.push_str(&segment.replace('~', "~0").replace('/', "~1"));
    }
    out
}

/// Splits a dot-separated field path into the segments PostgreSQL expects.
pub(crate) fn segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}
