//! Orders: building an order from a cart, pricing, and the status lifecycle.

mod aggregate;
mod commands;
mod pricing;
mod service;
mod status;
mod value_objects;

pub use aggregate::{Order, TimelineEntry};
pub use commands::{CartLine, PlaceOrder, SetOrderStatus};
pub use pricing::{PriceBreakdown, PricingPolicy, StandardPricing};
pub use service::{ClearedOrders, OrderService};
pub use status::OrderStatus;
pub use value_objects::{LineItem, PaymentInfo, PaymentMethod, PaymentStatus, ShippingInfo};

use common::ProductId;
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The submitted cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Invalid quantity.
    #[error("Invalid quantity for product {product}: {quantity} (must be at least 1)")]
    InvalidQuantity { product: ProductId, quantity: u32 },

    /// A required shipping field is blank.
    #[error("Please enter shipping {0}")]
    MissingShippingField(&'static str),

    /// A cart line references a product that no longer exists.
    #[error("Product {0} is no longer available")]
    ProductUnavailable(ProductId),

    /// The transition is not in the status table.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Order total is too large")]
    AmountOverflow,
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),

    /// The actor fulfils none of the order's line items.
    #[error("You are not allowed to modify this order")]
    NotEntitled,
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::InvalidTransition { .. } => ErrorKind::Conflict,
            OrderError::NotEntitled => ErrorKind::Authorization,
            OrderError::EmptyCart
            | OrderError::InvalidQuantity { .. }
            | OrderError::MissingShippingField(_)
            | OrderError::ProductUnavailable(_)
            | OrderError::AmountOverflow
            | OrderError::UnknownStatus(_)
            | OrderError::UnknownPaymentMethod(_) => ErrorKind::Validation,
        }
    }
}
