//! Domain error types.

use doc_store::StoreError;
use thiserror::Error;

use crate::account::AccountError;
use crate::catalog::CatalogError;
use crate::order::OrderError;

/// Classification of every failure the domain can report.
///
/// The HTTP layer maps each kind to one status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    InsufficientStock,
    Conflict,
    Upstream,
    Internal,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the document store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Account(#[from] AccountError),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The actor is authenticated but not entitled to the operation.
    #[error("{0}")]
    Forbidden(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        DomainError::Forbidden(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Store(StoreError::NotFound { .. }) => ErrorKind::NotFound,
            DomainError::Store(StoreError::RevisionConflict { .. })
            | DomainError::Store(StoreError::DuplicateId { .. }) => ErrorKind::Conflict,
            DomainError::Store(_) | DomainError::Serialization(_) => ErrorKind::Internal,
            DomainError::Order(e) => e.kind(),
            DomainError::Catalog(e) => e.kind(),
            DomainError::Account(e) => e.kind(),
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Forbidden(_) => ErrorKind::Authorization,
        }
    }
}
