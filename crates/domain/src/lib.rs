//! Domain layer for the marketplace.
//!
//! This crate provides:
//! - the catalog, with stock counters that never go negative
//! - the order builder and the order status state machine
//! - per-vendor order projections and the vendor dashboard
//! - user accounts with the address book and vendor onboarding
//!
//! Every entity is stored as one document through [`Repository`], which
//! retries read-modify-write cycles on revision conflicts.

pub mod account;
pub mod actor;
pub mod cart;
pub mod catalog;
pub mod entity;
pub mod error;
pub mod fulfillment;
pub mod money;
pub mod order;
pub mod repository;

pub use account::{
    AccountError, AccountService, Address, AddressInput, BusinessInfo, Registration, User,
    UserProfile, VendorInfo,
};
pub use actor::Actor;
pub use cart::{Cart, CartItem};
pub use catalog::{
    CatalogError, CatalogService, Category, PRODUCTS_PER_PAGE, Product, ProductDraft,
    ProductImage, ProductPage, ProductQuery, ProductUpdate, Review,
};
pub use entity::Entity;
pub use error::{DomainError, ErrorKind};
pub use fulfillment::{VendorDashboard, VendorOrderView};
pub use money::Money;
pub use order::{
    CartLine, ClearedOrders, LineItem, Order, OrderError, OrderService, OrderStatus, PaymentInfo,
    PaymentMethod, PaymentStatus, PlaceOrder, PriceBreakdown, PricingPolicy, SetOrderStatus,
    ShippingInfo, StandardPricing, TimelineEntry,
};
pub use repository::{Repository, Stored};
