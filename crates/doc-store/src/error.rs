use thiserror::Error;

use crate::{DocumentId, Revision};

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored revision did not match the one the writer read.
    #[error(
        "Revision conflict for {collection}/{id}: expected revision {expected}, found {actual}"
    )]
    RevisionConflict {
        collection: String,
        id: DocumentId,
        expected: Revision,
        actual: Revision,
    },

    /// No document with this id exists in the collection.
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: DocumentId },

    /// A document with this id already exists in the collection.
    #[error("Document already exists: {collection}/{id}")]
    DuplicateId { collection: String, id: DocumentId },

    /// The field targeted by a counter update is missing or not an integer.
    #[error("Field {path} of {collection}/{id} is not an integer counter")]
    NotACounter {
        collection: String,
        id: DocumentId,
        path: String,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if retrying against a fresh read may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::RevisionConflict { .. })
    }
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
