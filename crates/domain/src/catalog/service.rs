//! Catalog service: listing management, reviews and stock counters.

use common::{ProductId, UserId};
use doc_store::{CounterUpdate, DocumentStore, Filter};
use serde::{Deserialize, Serialize};

use super::{CatalogError, Category, Product, ProductDraft, ProductUpdate, Review};
use crate::actor::Actor;
use crate::entity::Entity;
use crate::error::DomainError;
use crate::money::Money;
use crate::repository::Repository;

/// Page size for catalog listings.
pub const PRODUCTS_PER_PAGE: usize = 12;

/// Listing filters. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    /// Case-insensitive match against the product name.
    pub keyword: Option<String>,
    pub category: Option<Category>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    /// 1-based page number.
    pub page: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// Number of products in the whole catalog.
    pub products_count: u64,
    /// Number of products matching the filters, across all pages.
    pub filtered_products_count: u64,
    pub res_per_page: usize,
}

/// Service for managing the product catalog.
pub struct CatalogService<S: DocumentStore> {
    products: Repository<S, Product>,
}

impl<S: DocumentStore + Clone> Clone for CatalogService<S> {
    fn clone(&self) -> Self {
        Self {
            products: self.products.clone(),
        }
    }
}

impl<S: DocumentStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self {
            products: Repository::new(store),
        }
    }

    pub fn repository(&self) -> &Repository<S, Product> {
        &self.products
    }

    /// Lists a new product owned by the acting vendor (or admin).
    #[tracing::instrument(skip(self, draft), fields(actor = %actor.id))]
    pub async fn create_product(
        &self,
        actor: &Actor,
        draft: ProductDraft,
    ) -> Result<Product, DomainError> {
        actor.require_seller()?;
        let product = Product::new(actor.id, draft)?;
        let stored = self.products.insert(product).await?;
        tracing::info!(product = %stored.entity.id, "product created");
        Ok(stored.into_inner())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, DomainError> {
        Ok(self.products.require(id).await?.into_inner())
    }

    /// Edits a listing. Returns the updated product and the images it no longer uses.
    #[tracing::instrument(skip(self, update), fields(actor = %actor.id))]
    pub async fn update_product(
        &self,
        actor: &Actor,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<(Product, Vec<super::ProductImage>), DomainError> {
        let mut replaced = Vec::new();
        let stored = self
            .products
            .update(id, |product| {
                ensure_owner(actor, product)?;
                replaced = product.apply(update.clone())?;
                Ok(())
            })
            .await?;
        Ok((stored.into_inner(), replaced))
    }

    /// Removes a listing and returns it so hosted images can be released.
    #[tracing::instrument(skip(self), fields(actor = %actor.id))]
    pub async fn delete_product(&self, actor: &Actor, id: ProductId) -> Result<Product, DomainError> {
        let product = self.products.require(id).await?.into_inner();
        ensure_owner(actor, &product)?;
        self.products.delete(id).await?;
        tracing::info!(product = %id, "product deleted");
        Ok(product)
    }

    /// Searches the catalog with optional keyword, category and price filters.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self, query: ProductQuery) -> Result<ProductPage, DomainError> {
        let mut filtered = self.products.query();
        if let Some(keyword) = query.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            filtered = filtered.filter(Filter::contains("name", keyword.trim()));
        }
        if let Some(category) = query.category {
            filtered = filtered.filter(Filter::eq("category", category.as_str()));
        }
        if query.min_price.is_some() || query.max_price.is_some() {
            filtered = filtered.filter(Filter::range(
                "price",
                query.min_price.map(|m| m.cents()),
                query.max_price.map(|m| m.cents()),
            ));
        }

        let products_count = self.products.count(self.products.query()).await?;
        let filtered_products_count = self.products.count(filtered.clone()).await?;

        let page = query.page.unwrap_or(1).max(1);
        let products = self
            .products
            .find(
                filtered
                    .newest_first()
                    .offset((page - 1) * PRODUCTS_PER_PAGE)
                    .limit(PRODUCTS_PER_PAGE),
            )
            .await?;

        Ok(ProductPage {
            products,
            products_count,
            filtered_products_count,
            res_per_page: PRODUCTS_PER_PAGE,
        })
    }

    /// Every product owned by a vendor, newest first.
    pub async fn vendor_products(&self, vendor: UserId) -> Result<Vec<Product>, DomainError> {
        self.products
            .find(
                self.products
                    .query()
                    .filter(Filter::eq("vendor", vendor.to_string()))
                    .newest_first(),
            )
            .await
    }

    pub async fn count_vendor_products(&self, vendor: UserId) -> Result<u64, DomainError> {
        self.products
            .count(
                self.products
                    .query()
                    .filter(Filter::eq("vendor", vendor.to_string())),
            )
            .await
    }

    /// Removes `quantity` units from stock in one conditional write.
    ///
    /// Fails with `InsufficientStock` (leaving stock untouched) when fewer
    /// than `quantity` units remain. Returns the remaining stock.
    #[tracing::instrument(skip(self))]
    pub async fn decrease_stock(&self, id: ProductId, quantity: u32) -> Result<u32, DomainError> {
        if quantity == 0 {
            return Err(CatalogError::InvalidQuantity { quantity }.into());
        }

        match self
            .products
            .store()
            .adjust_counter(Product::COLLECTION, id.into(), "stock", -(quantity as i64), 0)
            .await?
        {
            CounterUpdate::Applied { value, .. } => Ok(value as u32),
            CounterUpdate::Rejected { current } => {
                metrics::counter!("stock_decrement_rejected_total").increment(1);
                tracing::warn!(product = %id, requested = quantity, available = current, "insufficient stock");
                Err(CatalogError::InsufficientStock {
                    product: id,
                    requested: quantity,
                    available: current.max(0) as u32,
                }
                .into())
            }
        }
    }

    /// Returns `quantity` units to stock. Returns the new stock level.
    #[tracing::instrument(skip(self))]
    pub async fn restore_stock(&self, id: ProductId, quantity: u32) -> Result<u32, DomainError> {
        if quantity == 0 {
            return Err(CatalogError::InvalidQuantity { quantity }.into());
        }

        match self
            .products
            .store()
            .adjust_counter(Product::COLLECTION, id.into(), "stock", quantity as i64, 0)
            .await?
        {
            CounterUpdate::Applied { value, .. } => Ok(value as u32),
            // Adding a positive delta to a non-negative counter cannot cross the floor.
            CounterUpdate::Rejected { current } => Ok(current.max(0) as u32),
        }
    }

    /// Adds or replaces the actor's review of a product.
    #[tracing::instrument(skip(self, comment), fields(actor = %actor.id))]
    pub async fn submit_review(
        &self,
        actor: &Actor,
        product: ProductId,
        rating: u8,
        comment: String,
    ) -> Result<Product, DomainError> {
        let stored = self
            .products
            .update(product, |p| {
                p.upsert_review(Review {
                    user: actor.id,
                    name: actor.name.clone(),
                    rating,
                    comment: comment.clone(),
                })?;
                Ok(())
            })
            .await?;
        Ok(stored.into_inner())
    }

    pub async fn reviews(&self, product: ProductId) -> Result<Vec<Review>, DomainError> {
        Ok(self.get_product(product).await?.reviews)
    }
}

fn ensure_owner(actor: &Actor, product: &Product) -> Result<(), DomainError> {
    if actor.is_admin() || product.vendor == actor.id {
        Ok(())
    } else {
        Err(CatalogError::NotOwner.into())
    }
}
