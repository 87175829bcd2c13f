//! Order endpoints: checkout, order reads, payment intents and status changes.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::{OrderId, Role};
use doc_store::DocumentStore;
use domain::{
    CartLine, DomainError, ErrorKind, Money, OrderStatus, PaymentMethod, PlaceOrder,
    SetOrderStatus, ShippingInfo,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::extract::{CurrentUser, Envelope, parse_id};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewOrderRequest {
    pub items: Vec<CartLine>,
    #[serde(alias = "shippingInfo")]
    pub shipping: ShippingInfo,
    #[serde(alias = "paymentMethod")]
    pub payment_method: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// POST /order/new: runs a checkout for the acting customer.
#[tracing::instrument(skip(state, actor, payload), fields(actor = %actor.id))]
pub async fn create<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    payload: Result<Json<NewOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let method: PaymentMethod = req
        .payment_method
        .parse()
        .map_err(DomainError::from)?;

    let receipt = state
        .checkout
        .checkout(PlaceOrder::new(actor.id, req.items, req.shipping, method))
        .await?;

    Ok((
        StatusCode::CREATED,
        Envelope::ok(json!({
            "order": receipt.order,
            "checkout": receipt.checkout,
        })),
    ))
}

/// GET /order/{id}
///
/// Owners and admins see the whole order; a vendor with lines in it sees
/// only those lines.
#[tracing::instrument(skip(state, actor), fields(actor = %actor.id))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: OrderId = parse_id(&id)?;
    let body = match state.orders.get_order(&actor, id).await {
        Ok(order) => json!({ "order": order }),
        Err(e) if e.kind() == ErrorKind::Authorization && actor.role == Role::Vendor => {
            let view = state.orders.get_vendor_order(actor.id, id).await?;
            json!({ "order": view })
        }
        Err(e) => return Err(e.into()),
    };
    Ok(Envelope::ok(body))
}

/// GET /orders/me
pub async fn mine<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state.orders.my_orders(actor.id).await?;
    Ok(Envelope::ok(json!({ "orders": orders })))
}

/// GET /checkout/{id}
pub async fn checkout_record<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let checkout = state.checkout.get_checkout(&actor, parse_id(&id)?).await?;
    Ok(Envelope::ok(json!({ "checkout": checkout })))
}

/// POST /payment/process: opens a payment intent for the client.
#[tracing::instrument(skip(state, actor, payload), fields(actor = %actor.id))]
pub async fn payment_intent<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    if req.amount.is_negative() || req.amount.is_zero() {
        return Err(ApiError::BadRequest("Amount must be positive".into()));
    }
    let intent = state.checkout.payment_intent(req.amount).await?;
    Ok(Envelope::ok(json!({
        "client_secret": intent.client_secret,
        "transaction_id": intent.transaction_id,
    })))
}

/// PUT /admin/order/{id}: moves an order through its status table.
#[tracing::instrument(skip(state, actor, payload), fields(actor = %actor.id))]
pub async fn set_status<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id: OrderId = parse_id(&id)?;
    let Json(req) = payload?;
    let status: OrderStatus = req.status.parse().map_err(DomainError::from)?;

    let mut cmd = SetOrderStatus::new(id, status);
    if let Some(note) = req.note.filter(|n| !n.trim().is_empty()) {
        cmd = cmd.with_note(note);
    }
    let order = state.orders.set_status(&actor, cmd).await?;
    Ok(Envelope::ok(json!({ "order": order })))
}
