use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use serde::de::DeserializeOwned;

use crate::{Document, DocumentId, DocumentQuery, Result, Revision, StoreError};

/// Options for replacing a stored document.
#[derive(Debug, Clone, Default)]
pub struct ReplaceOptions {
    /// Revision the writer read. If None, the write is unconditional.
    pub expected_revision: Option<Revision>,
}

impl ReplaceOptions {
    /// Creates options with no revision check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the document to be at a specific revision.
    pub fn expect_revision(revision: Revision) -> Self {
        Self {
            expected_revision: Some(revision),
        }
    }
}

/// Outcome of a conditional counter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterUpdate {
    /// The delta was applied; `value` is the new counter value.
    Applied { value: i64, revision: Revision },
    /// Applying the delta would have crossed the floor; nothing was written.
    Rejected { current: i64 },
}

/// A stream of documents.
pub type DocumentStream = Pin<Box<dyn Stream<Item = Result<Document>> + Send>>;

/// Core trait for document store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document at [`Revision::first`].
    ///
    /// Fails with `DuplicateId` if the id is already taken in the collection.
    async fn insert(&self, doc: Document) -> Result<Revision>;

    /// Fetches a document. Returns None if it does not exist.
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>>;

    /// Replaces the body of an existing document.
    ///
    /// If `options.expected_revision` is set and does not match the stored
    /// revision, fails with `RevisionConflict` and writes nothing.
    async fn replace(&self, doc: Document, options: ReplaceOptions) -> Result<Revision>;

    /// Deletes a document. Returns false if it did not exist.
    async fn delete(&self, collection: &str, id: DocumentId) -> Result<bool>;

    /// Returns documents matching the query, sorted and paged.
    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>>;

    /// Counts documents matching the query's filters. Paging is ignored.
    async fn count(&self, query: DocumentQuery) -> Result<u64>;

    /// Deletes every document matching the query's filters and returns how many were removed.
    async fn delete_matching(&self, query: DocumentQuery) -> Result<u64>;

    /// Streams documents matching the query.
    async fn stream(&self, query: DocumentQuery) -> Result<DocumentStream>;

    /// Adds `delta` to the integer at `path` only if the result stays `>= floor`.
    ///
    /// The check and the write happen as a single atomic step, so concurrent
    /// callers can never drive the counter below the floor. Fails with
    /// `NotFound` when the document is missing.
    async fn adjust_counter(
        &self,
        collection: &str,
        id: DocumentId,
        path: &str,
        delta: i64,
        floor: i64,
    ) -> Result<CounterUpdate>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn insert(&self, doc: Document) -> Result<Revision> {
        (**self).insert(doc).await
    }

    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        (**self).get(collection, id).await
    }

    async fn replace(&self, doc: Document, options: ReplaceOptions) -> Result<Revision> {
        (**self).replace(doc, options).await
    }

    async fn delete(&self, collection: &str, id: DocumentId) -> Result<bool> {
        (**self).delete(collection, id).await
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        (**self).find(query).await
    }

    async fn count(&self, query: DocumentQuery) -> Result<u64> {
        (**self).count(query).await
    }

    async fn delete_matching(&self, query: DocumentQuery) -> Result<u64> {
        (**self).delete_matching(query).await
    }

    async fn stream(&self, query: DocumentQuery) -> Result<DocumentStream> {
        (**self).stream(query).await
    }

    async fn adjust_counter(
        &self,
        collection: &str,
        id: DocumentId,
        path: &str,
        delta: i64,
        floor: i64,
    ) -> Result<CounterUpdate> {
        (**self).adjust_counter(collection, id, path, delta, floor).await
    }
}

/// Extension trait providing typed convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Fetches and decodes a document.
    async fn get_as<T>(&self, collection: &str, id: DocumentId) -> Result<Option<(T, Revision)>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(collection, id).await? {
            Some(doc) => Ok(Some((doc.decode()?, doc.revision))),
            None => Ok(None),
        }
    }

    /// Fetches a document, failing with `NotFound` when it is missing.
    async fn require(&self, collection: &str, id: DocumentId) -> Result<Document> {
        self.get(collection, id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id,
            })
    }

    /// Checks whether a document exists.
    async fn exists(&self, collection: &str, id: DocumentId) -> Result<bool> {
        Ok(self.get(collection, id).await?.is_some())
    }
}

impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}
