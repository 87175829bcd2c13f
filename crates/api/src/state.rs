//! Shared application state.

use std::sync::Arc;

use checkout::{CheckoutCoordinator, EmailDispatcher, ImageHost, PaymentGateway};
use doc_store::DocumentStore;
use domain::{AccountService, CatalogService, OrderService, PricingPolicy};

/// Coordinator type used by the server: providers are chosen at startup.
pub type Checkout<S> = CheckoutCoordinator<S, Arc<dyn PaymentGateway>, Arc<dyn EmailDispatcher>>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: DocumentStore> {
    pub accounts: AccountService<S>,
    pub catalog: CatalogService<S>,
    pub orders: OrderService<S>,
    pub checkout: Checkout<S>,
    pub images: Arc<dyn ImageHost>,
}

/// External collaborators wired into the state.
#[derive(Clone)]
pub struct Providers {
    pub payment: Arc<dyn PaymentGateway>,
    pub email: Arc<dyn EmailDispatcher>,
    pub images: Arc<dyn ImageHost>,
}

impl<S: DocumentStore + Clone> AppState<S> {
    pub fn new(store: S, pricing: Arc<dyn PricingPolicy>, providers: Providers) -> Self {
        let checkout = CheckoutCoordinator::with_pricing(
            store.clone(),
            pricing,
            providers.payment,
            providers.email,
        );
        Self {
            accounts: AccountService::new(store.clone()),
            catalog: CatalogService::new(store),
            orders: checkout.orders().clone(),
            checkout,
            images: providers.images,
        }
    }
}
