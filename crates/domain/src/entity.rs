//! Core entity trait.

use common::DocumentId;
use serde::{Serialize, de::DeserializeOwned};

/// An entity persisted as one document in a named collection.
///
/// The whole entity, including embedded children (reviews, addresses,
/// line items), is written in a single document so invariants spanning
/// those children hold after every write.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// The identifier type of this entity.
    type Id: Into<DocumentId> + Copy + Send + Sync + std::fmt::Display + std::fmt::Debug;

    /// Collection name in the document store.
    const COLLECTION: &'static str;

    /// Human-readable name used in not-found messages.
    const NAME: &'static str;

    fn id(&self) -> Self::Id;
}
