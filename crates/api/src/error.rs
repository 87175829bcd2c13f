//! API error types with HTTP response mapping.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::{DomainError, ErrorKind};
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
///
/// Every failure leaves the server as `{"success": false, "message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable identity on the request.
    #[error("{0}")]
    Unauthenticated(String),

    /// Malformed request from the client.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthenticated(_) => ErrorKind::Authentication,
            ApiError::BadRequest(_) => ErrorKind::Validation,
            ApiError::Domain(e) => e.kind(),
            ApiError::Checkout(e) => e.kind(),
        }
    }

    /// Message shown to the client. Aborted checkouts report their cause.
    fn client_message(&self) -> String {
        match self {
            ApiError::Checkout(CheckoutError::Aborted { source, .. }) => source.to_string(),
            other => other.to_string(),
        }
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::InsufficientStock => StatusCode::BAD_REQUEST,
        ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Upstream | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = match kind {
            ErrorKind::Internal => {
                tracing::error!(error = %self, "internal server error");
                "Internal server error".to_string()
            }
            ErrorKind::Upstream => {
                tracing::error!(error = %self, "upstream provider error");
                self.client_message()
            }
            _ => self.client_message(),
        };

        let body = serde_json::json!({ "success": false, "message": message });
        (status_for(kind), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
