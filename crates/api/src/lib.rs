//! HTTP API server with observability for the marketplace.
//!
//! Provides the REST surface under `/api/v1` for accounts, the catalog,
//! checkout, vendor fulfillment and vendor onboarding, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use checkout::{InMemoryEmailDispatcher, InMemoryImageHost, InMemoryPaymentGateway};
use doc_store::DocumentStore;
use domain::PricingPolicy;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{AppState, Providers};

/// Prefix shared by every business route.
pub const API_PREFIX: &str = "/api/v1";

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DocumentStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{accounts, health, orders, products, vendors};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/health", get(health::check))
        .route("/register", post(accounts::register::<S>))
        .route("/me", get(accounts::me::<S>))
        .route("/me/address", post(accounts::add_address::<S>))
        .route(
            "/me/address/{id}",
            put(accounts::update_address::<S>).delete(accounts::remove_address::<S>),
        )
        .route(
            "/products",
            get(products::list::<S>).post(products::create::<S>),
        )
        .route("/products/vendor", get(products::mine::<S>))
        .route("/products/review", put(products::review::<S>))
        .route(
            "/products/{id}",
            get(products::get::<S>)
                .put(products::update::<S>)
                .delete(products::delete::<S>),
        )
        .route(
            "/products/{id}/decrease-stock",
            patch(products::decrease_stock::<S>),
        )
        .route("/products/{id}/reviews", get(products::reviews::<S>))
        .route("/order/new", post(orders::create::<S>))
        .route("/order/{id}", get(orders::get::<S>))
        .route("/orders/me", get(orders::mine::<S>))
        .route("/checkout/{id}", get(orders::checkout_record::<S>))
        .route("/payment/process", post(orders::payment_intent::<S>))
        .route("/vendor/orders", get(vendors::orders::<S>))
        .route(
            "/vendor/orders/delivered",
            delete(vendors::clear_delivered::<S>),
        )
        .route("/vendor/dashboard", get(vendors::dashboard::<S>))
        .route("/vendor/apply", post(vendors::apply::<S>))
        .route("/admin/order/{id}", put(orders::set_status::<S>))
        .route("/admin/vendors", get(vendors::list::<S>))
        .route(
            "/admin/vendor/applications",
            get(vendors::applications::<S>),
        )
        .route("/admin/vendor/{id}", put(vendors::decide::<S>))
        .with_state(state);

    Router::new()
        .nest(API_PREFIX, api)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// In-memory providers, used by the default server and in tests.
pub fn in_memory_providers() -> Providers {
    Providers {
        payment: Arc::new(InMemoryPaymentGateway::new()),
        email: Arc::new(InMemoryEmailDispatcher::new()),
        images: Arc::new(InMemoryImageHost::new()),
    }
}

/// Creates the application state over `store` with the given pricing and providers.
pub fn create_state<S: DocumentStore + Clone + 'static>(
    store: S,
    pricing: Arc<dyn PricingPolicy>,
    providers: Providers,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, pricing, providers))
}
