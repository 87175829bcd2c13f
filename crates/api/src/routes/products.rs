//! Catalog endpoints: listings, stock and reviews.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use checkout::ImageHost;
use common::ProductId;
use doc_store::DocumentStore;
use domain::{Category, DomainError, Money, ProductDraft, ProductImage, ProductQuery, ProductUpdate};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::extract::{CurrentUser, Envelope, parse_id};
use crate::state::AppState;

/// Folder hosted product images are uploaded into.
pub const PRODUCT_IMAGE_FOLDER: &str = "products";

#[derive(Debug, Deserialize)]
pub struct NewProductRequest {
    pub name: String,
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub stock: u32,
    pub category: Category,
    /// Image payloads (data URIs or remote URLs) to upload.
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u32>,
    pub category: Option<Category>,
    /// Replaces every image when present.
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct DecreaseStockRequest {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub product_id: ProductId,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// GET /products
#[tracing::instrument(skip(state, query))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let page = state.catalog.list_products(query).await?;
    Ok(Envelope::ok(page))
}

/// POST /products: uploads images first, then stores the listing.
#[tracing::instrument(skip(state, actor, payload), fields(actor = %actor.id))]
pub async fn create<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    payload: Result<Json<NewProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    actor.require_seller()?;

    let mut draft = ProductDraft {
        name: req.name,
        description: req.description,
        price: req.price,
        stock: req.stock,
        category: req.category,
        images: Vec::new(),
    };
    draft.validate().map_err(DomainError::from)?;

    draft.images = upload_all(state.images.as_ref(), &req.images).await?;
    let uploaded = draft.images.clone();
    match state.catalog.create_product(&actor, draft).await {
        Ok(product) => Ok((StatusCode::CREATED, Envelope::ok(json!({ "product": product })))),
        Err(e) => {
            discard(state.images.as_ref(), &uploaded).await;
            Err(e.into())
        }
    }
}

/// GET /products/vendor: the acting vendor's own listings.
#[tracing::instrument(skip(state, actor), fields(actor = %actor.id))]
pub async fn mine<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    actor.require_seller()?;
    let products = state.catalog.vendor_products(actor.id).await?;
    Ok(Envelope::ok(json!({ "products": products })))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.catalog.get_product(parse_id(&id)?).await?;
    Ok(Envelope::ok(json!({ "product": product })))
}

/// PUT /products/{id}
#[tracing::instrument(skip(state, actor, payload), fields(actor = %actor.id))]
pub async fn update<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProductId = parse_id(&id)?;
    let Json(req) = payload?;

    let images = match &req.images {
        Some(data) => Some(upload_all(state.images.as_ref(), data).await?),
        None => None,
    };
    let uploaded = images.clone().unwrap_or_default();
    let update = ProductUpdate {
        name: req.name,
        description: req.description,
        price: req.price,
        stock: req.stock,
        category: req.category,
        images,
    };

    match state.catalog.update_product(&actor, id, update).await {
        Ok((product, replaced)) => {
            discard(state.images.as_ref(), &replaced).await;
            Ok(Envelope::ok(json!({ "product": product })))
        }
        Err(e) => {
            discard(state.images.as_ref(), &uploaded).await;
            Err(e.into())
        }
    }
}

/// DELETE /products/{id}
#[tracing::instrument(skip(state, actor), fields(actor = %actor.id))]
pub async fn delete<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.catalog.delete_product(&actor, parse_id(&id)?).await?;
    discard(state.images.as_ref(), &product.images).await;
    Ok(Envelope::ok(json!({ "message": "Product deleted successfully" })))
}

/// PATCH /products/{id}/decrease-stock
#[tracing::instrument(skip(state, actor, payload), fields(actor = %actor.id))]
pub async fn decrease_stock<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<DecreaseStockRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProductId = parse_id(&id)?;
    let Json(req) = payload?;
    let stock = state.catalog.decrease_stock(id, req.quantity).await?;
    Ok(Envelope::ok(json!({ "product": id, "stock": stock })))
}

/// PUT /products/review
#[tracing::instrument(skip(state, actor, payload), fields(actor = %actor.id))]
pub async fn review<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let product = state
        .catalog
        .submit_review(&actor, req.product_id, req.rating, req.comment)
        .await?;
    Ok(Envelope::ok(json!({
        "ratings": product.ratings,
        "num_of_reviews": product.num_of_reviews,
    })))
}

/// GET /products/{id}/reviews
#[tracing::instrument(skip(state))]
pub async fn reviews<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let reviews = state.catalog.reviews(parse_id(&id)?).await?;
    Ok(Envelope::ok(json!({ "reviews": reviews })))
}

/// Uploads every payload, removing the ones already stored if one fails.
async fn upload_all(host: &dyn ImageHost, data: &[String]) -> Result<Vec<ProductImage>, ApiError> {
    let mut uploaded = Vec::with_capacity(data.len());
    for payload in data {
        match host.upload(payload, PRODUCT_IMAGE_FOLDER).await {
            Ok(image) => uploaded.push(image),
            Err(e) => {
                discard(host, &uploaded).await;
                return Err(e.into());
            }
        }
    }
    Ok(uploaded)
}

/// Best-effort removal of hosted images.
async fn discard(host: &dyn ImageHost, images: &[ProductImage]) {
    for image in images {
        if let Err(e) = host.destroy(&image.public_id).await {
            tracing::warn!(public_id = %image.public_id, error = %e, "could not destroy hosted image");
        }
    }
}
