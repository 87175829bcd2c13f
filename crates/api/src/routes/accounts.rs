//! Account endpoints: registration, profile and address book.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use doc_store::DocumentStore;
use domain::{AddressInput, Registration, UserProfile};
use serde_json::json;

use crate::error::ApiError;
use crate::extract::{CurrentUser, Envelope, parse_id};
use crate::state::AppState;

/// POST /register
#[tracing::instrument(skip(state, payload))]
pub async fn register<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(registration) = payload?;
    let user = state.accounts.register(registration).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::ok(json!({ "user": UserProfile::from(user) })),
    ))
}

/// GET /me
pub async fn me<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.accounts.get_user(actor.id).await?;
    Ok(Envelope::ok(json!({ "user": UserProfile::from(user) })))
}

/// POST /me/address
#[tracing::instrument(skip(state, actor, payload), fields(actor = %actor.id))]
pub async fn add_address<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    payload: Result<Json<AddressInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload?;
    let user = state.accounts.add_address(actor.id, input).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::ok(json!({ "addresses": user.addresses })),
    ))
}

/// PUT /me/address/{id}
#[tracing::instrument(skip(state, actor, payload), fields(actor = %actor.id))]
pub async fn update_address<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<AddressInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let address = parse_id(&id)?;
    let Json(input) = payload?;
    let user = state
        .accounts
        .update_address(actor.id, address, input)
        .await?;
    Ok(Envelope::ok(json!({ "addresses": user.addresses })))
}

/// DELETE /me/address/{id}
#[tracing::instrument(skip(state, actor), fields(actor = %actor.id))]
pub async fn remove_address<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .accounts
        .remove_address(actor.id, parse_id(&id)?)
        .await?;
    Ok(Envelope::ok(json!({ "addresses": user.addresses })))
}
