//! Shared types used across the marketplace crates.

mod ids;
mod role;

pub use ids::{AddressId, CheckoutId, DocumentId, OrderId, ProductId, UserId};
pub use role::{ParseRoleError, Role};
