//! Product catalog: listings, reviews and stock.

mod product;
mod service;

pub use product::{Category, Product, ProductDraft, ProductImage, ProductUpdate, Review};
pub use service::{CatalogService, PRODUCTS_PER_PAGE, ProductPage, ProductQuery};

use common::ProductId;
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Requested quantity exceeds the available stock.
    #[error("Insufficient stock for product {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: ProductId,
        requested: u32,
        available: u32,
    },

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Please enter product {0}")]
    MissingField(&'static str),

    #[error("Price cannot be negative")]
    NegativePrice,

    /// Only the owning vendor or an admin may change a listing.
    #[error("You can only modify your own products")]
    NotOwner,
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CatalogError::NotOwner => ErrorKind::Authorization,
            CatalogError::InvalidQuantity { .. }
            | CatalogError::InvalidRating(_)
            | CatalogError::UnknownCategory(_)
            | CatalogError::MissingField(_)
            | CatalogError::NegativePrice => ErrorKind::Validation,
        }
    }
}
