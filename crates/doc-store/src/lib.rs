//! Document storage for the marketplace.
//!
//! Entities are stored as JSON documents grouped by collection. Each
//! document carries a [`Revision`] used for optimistic concurrency, and
//! numeric fields can be adjusted with [`DocumentStore::adjust_counter`],
//! a single conditional write that never lets a counter cross its floor.

pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::DocumentId;
pub use document::{Document, Revision};
pub use error::{Result, StoreError};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::{DocumentQuery, Filter, SortKey, SortOrder};
pub use store::{CounterUpdate, DocumentStore, DocumentStoreExt, DocumentStream, ReplaceOptions};
