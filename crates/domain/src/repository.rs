//! Typed persistence on top of the document store.

use std::marker::PhantomData;

use doc_store::{
    Document, DocumentQuery, DocumentStore, DocumentStoreExt, ReplaceOptions, Revision,
};

use crate::entity::Entity;
use crate::error::DomainError;

/// Number of read-modify-write attempts before a revision conflict is surfaced.
const MAX_UPDATE_ATTEMPTS: usize = 5;

/// An entity together with the revision it was read or written at.
#[derive(Debug, Clone)]
pub struct Stored<E> {
    pub entity: E,
    pub revision: Revision,
}

impl<E> Stored<E> {
    pub fn into_inner(self) -> E {
        self.entity
    }
}

/// Loads and saves entities of one type.
///
/// Updates are read-modify-write cycles guarded by the document revision.
/// When another writer gets in first, the mutation is re-run against the
/// fresh document, so concurrent updates are never lost and a partially
/// applied mutation is never persisted.
pub struct Repository<S, E>
where
    S: DocumentStore,
    E: Entity,
{
    store: S,
    _phantom: PhantomData<E>,
}

impl<S, E> Clone for Repository<S, E>
where
    S: DocumentStore + Clone,
    E: Entity,
{
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<S, E> Repository<S, E>
where
    S: DocumentStore,
    E: Entity,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying document store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Starts a query over this entity's collection.
    pub fn query(&self) -> DocumentQuery {
        DocumentQuery::collection(E::COLLECTION)
    }

    /// Persists a new entity.
    pub async fn insert(&self, entity: E) -> Result<Stored<E>, DomainError> {
        let doc = Document::from_value(E::COLLECTION, entity.id(), &entity)?;
        let revision = self.store.insert(doc).await?;
        Ok(Stored { entity, revision })
    }

    /// Loads an entity, returning None if it doesn't exist.
    pub async fn load(&self, id: E::Id) -> Result<Option<Stored<E>>, DomainError> {
        let loaded = self.store.get_as::<E>(E::COLLECTION, id.into()).await?;
        Ok(loaded.map(|(entity, revision)| Stored { entity, revision }))
    }

    /// Loads an entity, failing with a not-found error if it doesn't exist.
    pub async fn require(&self, id: E::Id) -> Result<Stored<E>, DomainError> {
        self.load(id)
            .await?
            .ok_or_else(|| DomainError::not_found(E::NAME, id))
    }

    /// Applies `mutate` to the current entity and saves the result.
    ///
    /// `mutate` may run more than once if a concurrent writer wins the race;
    /// it must only depend on the entity it is given.
    pub async fn update<F>(&self, id: E::Id, mut mutate: F) -> Result<Stored<E>, DomainError>
    where
        F: FnMut(&mut E) -> Result<(), DomainError>,
    {
        let mut attempt = 1;
        loop {
            let Stored {
                mut entity,
                revision,
            } = self.require(id).await?;

            mutate(&mut entity)?;

            let doc = Document::from_value(E::COLLECTION, id, &entity)?;
            match self
                .store
                .replace(doc, ReplaceOptions::expect_revision(revision))
                .await
            {
                Ok(revision) => return Ok(Stored { entity, revision }),
                Err(e) if e.is_conflict() && attempt < MAX_UPDATE_ATTEMPTS => {
                    tracing::debug!(entity = E::NAME, %id, attempt, "revision conflict, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Returns every entity matching the query.
    pub async fn find(&self, query: DocumentQuery) -> Result<Vec<E>, DomainError> {
        let docs = self.store.find(query).await?;
        docs.iter()
            .map(|doc| doc.decode().map_err(DomainError::from))
            .collect()
    }

    pub async fn count(&self, query: DocumentQuery) -> Result<u64, DomainError> {
        Ok(self.store.count(query).await?)
    }

    /// Deletes an entity. Returns false if it did not exist.
    pub async fn delete(&self, id: E::Id) -> Result<bool, DomainError> {
        Ok(self.store.delete(E::COLLECTION, id.into()).await?)
    }

    pub async fn delete_matching(&self, query: DocumentQuery) -> Result<u64, DomainError> {
        Ok(self.store.delete_matching(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use common::DocumentId;
    use doc_store::{Filter, InMemoryDocumentStore};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Counter {
        id: DocumentId,
        label: String,
        hits: u32,
    }

    impl Entity for Counter {
        type Id = DocumentId;
        const COLLECTION: &'static str = "counters";
        const NAME: &'static str = "Counter";

        fn id(&self) -> DocumentId {
            self.id
        }
    }

    fn counter(label: &str) -> Counter {
        Counter {
            id: DocumentId::new(),
            label: label.to_string(),
            hits: 0,
        }
    }

    #[tokio::test]
    async fn insert_then_load() {
        let repo: Repository<_, Counter> = Repository::new(InMemoryDocumentStore::new());
        let c = counter("a");
        let id = c.id;

        let stored = repo.insert(c).await.unwrap();
        assert_eq!(stored.revision, Revision::first());

        let loaded = repo.load(id).await.unwrap().unwrap();
        assert_eq!(loaded.entity.label, "a");
    }

    #[tokio::test]
    async fn require_missing_is_not_found() {
        let repo: Repository<_, Counter> = Repository::new(InMemoryDocumentStore::new());
        let err = repo.require(DocumentId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().starts_with("Counter not found"));
    }

    #[tokio::test]
    async fn failed_mutation_writes_nothing() {
        let repo: Repository<_, Counter> = Repository::new(InMemoryDocumentStore::new());
        let c = counter("a");
        let id = c.id;
        repo.insert(c).await.unwrap();

        let result = repo
            .update(id, |c| {
                c.hits = 99;
                Err(DomainError::forbidden("no"))
            })
            .await;
        assert!(result.is_err());

        let loaded = repo.require(id).await.unwrap();
        assert_eq!(loaded.entity.hits, 0);
        assert_eq!(loaded.revision, Revision::first());
    }

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        let repo: Repository<_, Counter> = Repository::new(InMemoryDocumentStore::new());
        let c = counter("a");
        let id = c.id;
        repo.insert(c).await.unwrap();

        let updates = (0..4).map(|_| {
            let repo = repo.clone();
            async move { repo.update(id, |c| {
                c.hits += 1;
                Ok(())
            })
            .await }
        });
        for result in futures_util::future::join_all(updates).await {
            result.unwrap();
        }

        assert_eq!(repo.require(id).await.unwrap().entity.hits, 4);
    }

    #[tokio::test]
    async fn find_decodes_matches() {
        let repo: Repository<_, Counter> = Repository::new(InMemoryDocumentStore::new());
        repo.insert(counter("keep")).await.unwrap();
        repo.insert(counter("skip")).await.unwrap();

        let found = repo
            .find(repo.query().filter(Filter::eq("label", "keep")))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].label, "keep");
    }
}
