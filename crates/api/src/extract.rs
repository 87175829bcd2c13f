//! Request extractors and response envelope.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use doc_store::DocumentStore;
use domain::Actor;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated actor, resolved from [`USER_ID_HEADER`].
///
/// The identity provider in front of the server sets the header; the role
/// is always read from the stored account.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Actor);

impl<S> FromRequestParts<Arc<AppState<S>>> for CurrentUser
where
    S: DocumentStore + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthenticated("Login first to access this resource".into()))?;
        let id = UserId::from_str(header.trim())
            .map_err(|_| ApiError::Unauthenticated("Invalid user identity".into()))?;

        match state.accounts.actor(id).await? {
            Some(actor) => Ok(CurrentUser(actor)),
            None => {
                tracing::debug!(user = %id, "request from unknown user");
                Err(ApiError::Unauthenticated("Unknown user".into()))
            }
        }
    }
}

/// Success envelope: `{"success": true, ...body}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(body: T) -> Json<Self> {
        Json(Self {
            success: true,
            body,
        })
    }
}

/// Parses a path segment into a typed id.
pub fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid ID format: {raw}")))
}
