//! Vendor fulfillment and onboarding endpoints, and the admin review queue.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use doc_store::DocumentStore;
use domain::{BusinessInfo, UserProfile};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::extract::{CurrentUser, Envelope, parse_id};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub approved: bool,
}

/// GET /vendor/orders: orders projected to the vendor's lines.
#[tracing::instrument(skip(state, actor), fields(actor = %actor.id))]
pub async fn orders<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    actor.require_seller()?;
    let orders = state.orders.orders_for_vendor(actor.id).await?;
    Ok(Envelope::ok(json!({ "orders": orders })))
}

/// DELETE /vendor/orders/delivered
#[tracing::instrument(skip(state, actor), fields(actor = %actor.id))]
pub async fn clear_delivered<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let cleared = state.orders.clear_delivered(&actor).await?;
    Ok(Envelope::ok(cleared))
}

/// GET /vendor/dashboard
#[tracing::instrument(skip(state, actor), fields(actor = %actor.id))]
pub async fn dashboard<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    actor.require_seller()?;
    let dashboard = state.orders.vendor_dashboard(actor.id).await?;
    Ok(Envelope::ok(dashboard))
}

/// POST /vendor/apply
#[tracing::instrument(skip(state, actor, payload), fields(actor = %actor.id))]
pub async fn apply<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    payload: Result<Json<BusinessInfo>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(info) = payload?;
    let user = state.accounts.apply_as_vendor(actor.id, info).await?;
    Ok(Envelope::ok(json!({
        "message": "Vendor application submitted successfully",
        "user": UserProfile::from(user),
    })))
}

/// GET /admin/vendors
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let vendors: Vec<UserProfile> = state
        .accounts
        .list_vendors(&actor)
        .await?
        .into_iter()
        .map(UserProfile::from)
        .collect();
    Ok(Envelope::ok(json!({ "vendors": vendors })))
}

/// GET /admin/vendor/applications
pub async fn applications<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let applications: Vec<UserProfile> = state
        .accounts
        .pending_applications(&actor)
        .await?
        .into_iter()
        .map(UserProfile::from)
        .collect();
    Ok(Envelope::ok(json!({ "applications": applications })))
}

/// PUT /admin/vendor/{id}: approves or rejects an application.
#[tracing::instrument(skip(state, actor, payload), fields(actor = %actor.id))]
pub async fn decide<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_id(&id)?;
    let Json(req) = payload?;
    let user = state
        .accounts
        .decide_vendor_application(&actor, user_id, req.approved)
        .await?;
    let message = if req.approved {
        "Vendor application approved"
    } else {
        "Vendor application rejected"
    };
    Ok(Envelope::ok(json!({
        "message": message,
        "user": UserProfile::from(user),
    })))
}
