use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Document, DocumentId, DocumentQuery, Result, Revision, StoreError,
    document::pointer,
    store::{CounterUpdate, DocumentStore, DocumentStream, ReplaceOptions},
};

type Key = (String, DocumentId);

/// In-memory document store implementation.
///
/// Provides the same interface and atomicity guarantees as the PostgreSQL
/// implementation; every mutation happens under a single write lock.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<HashMap<Key, Document>>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of documents stored across collections.
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Removes every document.
    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }

    fn key(collection: &str, id: DocumentId) -> Key {
        (collection.to_string(), id)
    }

    fn select(documents: &HashMap<Key, Document>, query: &DocumentQuery) -> Vec<Document> {
        let mut matched: Vec<_> = documents
            .values()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect();
        matched.sort_by(|a, b| query.compare(a, b));

        let offset = query.offset.unwrap_or(0);
        let matched = matched.into_iter().skip(offset);
        match query.limit {
            Some(limit) => matched.take(limit).collect(),
            None => matched.collect(),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, mut doc: Document) -> Result<Revision> {
        let mut documents = self.documents.write().await;
        let key = Self::key(&doc.collection, doc.id);
        if documents.contains_key(&key) {
            return Err(StoreError::DuplicateId {
                collection: doc.collection,
                id: doc.id,
            });
        }

        doc.revision = Revision::first();
        documents.insert(key, doc);
        Ok(Revision::first())
    }

    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.get(&Self::key(collection, id)).cloned())
    }

    async fn replace(&self, doc: Document, options: ReplaceOptions) -> Result<Revision> {
        let mut documents = self.documents.write().await;
        let Some(stored) = documents.get_mut(&Self::key(&doc.collection, doc.id)) else {
            return Err(StoreError::NotFound {
                collection: doc.collection,
                id: doc.id,
            });
        };

        if let Some(expected) = options.expected_revision
            && stored.revision != expected
        {
            metrics::counter!("store_revision_conflicts_total").increment(1);
            return Err(StoreError::RevisionConflict {
                collection: doc.collection,
                id: doc.id,
                expected,
                actual: stored.revision,
            });
        }

        stored.revision = stored.revision.next();
        stored.updated_at = Utc::now();
        stored.body = doc.body;
        Ok(stored.revision)
    }

    async fn delete(&self, collection: &str, id: DocumentId) -> Result<bool> {
        let mut documents = self.documents.write().await;
        Ok(documents.remove(&Self::key(collection, id)).is_some())
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;
        Ok(Self::select(&documents, &query))
    }

    async fn count(&self, query: DocumentQuery) -> Result<u64> {
        let documents = self.documents.read().await;
        Ok(documents.values().filter(|doc| query.matches(doc)).count() as u64)
    }

    async fn delete_matching(&self, query: DocumentQuery) -> Result<u64> {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|_, doc| !query.matches(doc));
        Ok((before - documents.len()) as u64)
    }

    async fn stream(&self, query: DocumentQuery) -> Result<DocumentStream> {
        use futures_util::stream;

        let documents = self.documents.read().await;
        let selected = Self::select(&documents, &query);
        Ok(Box::pin(stream::iter(selected.into_iter().map(Ok))))
    }

    async fn adjust_counter(
        &self,
        collection: &str,
        id: DocumentId,
        path: &str,
        delta: i64,
        floor: i64,
    ) -> Result<CounterUpdate> {
        let mut documents = self.documents.write().await;
        let Some(doc) = documents.get_mut(&Self::key(collection, id)) else {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            });
        };

        let not_a_counter = || StoreError::NotACounter {
            collection: collection.to_string(),
            id,
            path: path.to_string(),
        };
        let slot = doc.body.pointer_mut(&pointer(path)).ok_or_else(not_a_counter)?;
        let current = slot.as_i64().ok_or_else(not_a_counter)?;

        let value = current + delta;
        if value < floor {
            return Ok(CounterUpdate::Rejected { current });
        }

        *slot = serde_json::Value::from(value);
        doc.revision = doc.revision.next();
        doc.updated_at = Utc::now();
        Ok(CounterUpdate::Applied {
            value,
            revision: doc.revision,
        })
    }
}
