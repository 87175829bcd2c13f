//! Order service: placing orders, reading them, and driving their status.

use std::sync::Arc;

use chrono::Utc;
use common::{OrderId, Role, UserId};
use doc_store::{DocumentStore, Filter};
use serde::Serialize;

use crate::actor::Actor;
use crate::catalog::CatalogService;
use crate::error::DomainError;
use crate::fulfillment::{self, VendorDashboard, VendorOrderView};
use crate::money::Money;
use crate::repository::Repository;

use super::{
    LineItem, Order, OrderError, OrderStatus, PaymentInfo, PlaceOrder, PriceBreakdown,
    PricingPolicy, SetOrderStatus, StandardPricing,
};

/// Result of a bulk removal of delivered orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearedOrders {
    pub deleted: u64,
    /// Delivered orders left in place because other vendors share them.
    pub skipped: u64,
}

/// Service for managing orders.
pub struct OrderService<S: DocumentStore> {
    orders: Repository<S, Order>,
    catalog: CatalogService<S>,
    pricing: Arc<dyn PricingPolicy>,
}

impl<S: DocumentStore + Clone> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            orders: self.orders.clone(),
            catalog: self.catalog.clone(),
            pricing: Arc::clone(&self.pricing),
        }
    }
}

impl<S: DocumentStore + Clone> OrderService<S> {
    /// Creates an order service using [`StandardPricing`].
    pub fn new(store: S) -> Self {
        Self::with_pricing(store, Arc::new(StandardPricing::default()))
    }

    pub fn with_pricing(store: S, pricing: Arc<dyn PricingPolicy>) -> Self {
        Self {
            orders: Repository::new(store.clone()),
            catalog: CatalogService::new(store),
            pricing,
        }
    }
}

impl<S: DocumentStore> OrderService<S> {
    pub fn repository(&self) -> &Repository<S, Order> {
        &self.orders
    }

    pub fn pricing(&self) -> &dyn PricingPolicy {
        self.pricing.as_ref()
    }

    /// Validates a cart and builds the order it would produce, without saving it.
    ///
    /// Lines are resolved in cart order; each takes a snapshot of the
    /// product's current name, price, first image and vendor. Stock is
    /// neither checked nor touched.
    #[tracing::instrument(skip(self, cmd), fields(user = %cmd.user, lines = cmd.lines.len()))]
    pub async fn prepare_order(&self, cmd: &PlaceOrder) -> Result<Order, DomainError> {
        if cmd.lines.is_empty() {
            return Err(OrderError::EmptyCart.into());
        }
        if let Some(line) = cmd.lines.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product: line.product,
                quantity: line.quantity,
            }
            .into());
        }
        cmd.shipping.validate()?;

        let mut items = Vec::with_capacity(cmd.lines.len());
        let mut subtotal = Money::zero();
        for line in cmd.merged_lines()? {
            let product = self
                .catalog
                .repository()
                .load(line.product)
                .await?
                .ok_or(OrderError::ProductUnavailable(line.product))?
                .into_inner();

            subtotal = product
                .price
                .checked_multiply(line.quantity)
                .and_then(|line_total| subtotal.checked_add(line_total))
                .ok_or(OrderError::AmountOverflow)?;
            items.push(LineItem {
                product: product.id,
                name: product.name.clone(),
                price: product.price,
                image: product.thumbnail().map(str::to_string),
                quantity: line.quantity,
                vendor: product.vendor,
            });
        }

        let tax = self.pricing.tax(subtotal);
        let shipping = self.pricing.shipping(subtotal);
        subtotal
            .checked_add(tax)
            .and_then(|total| total.checked_add(shipping))
            .ok_or(OrderError::AmountOverflow)?;
        let prices = PriceBreakdown::new(subtotal, tax, shipping);

        Ok(Order::new(
            cmd.user,
            cmd.shipping.clone(),
            items,
            PaymentInfo::pending(cmd.payment_method),
            prices,
            Utc::now(),
        ))
    }

    /// Persists an order built by [`prepare_order`](Self::prepare_order).
    pub async fn save_new(&self, order: Order) -> Result<Order, DomainError> {
        let stored = self.orders.insert(order).await?;
        let order = stored.into_inner();
        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(
            order = %order.id,
            user = %order.user,
            total = %order.prices.total,
            "order placed"
        );
        Ok(order)
    }

    /// Builds and saves an order in `Processing`. Stock is left untouched.
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order, DomainError> {
        let order = self.prepare_order(&cmd).await?;
        self.save_new(order).await
    }

    /// Loads an order for its owner or an admin.
    #[tracing::instrument(skip(self), fields(actor = %actor.id))]
    pub async fn get_order(&self, actor: &Actor, id: OrderId) -> Result<Order, DomainError> {
        let order = self.orders.require(id).await?.into_inner();
        if order.user == actor.id || actor.is_admin() {
            Ok(order)
        } else {
            Err(OrderError::NotEntitled.into())
        }
    }

    /// Loads an order as seen by a vendor with lines in it.
    #[tracing::instrument(skip(self))]
    pub async fn get_vendor_order(
        &self,
        vendor: UserId,
        id: OrderId,
    ) -> Result<VendorOrderView, DomainError> {
        let order = self.orders.require(id).await?.into_inner();
        fulfillment::partition(&order, vendor).ok_or_else(|| OrderError::NotEntitled.into())
    }

    /// Orders placed by a customer, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn my_orders(&self, user: UserId) -> Result<Vec<Order>, DomainError> {
        self.orders
            .find(
                self.orders
                    .query()
                    .filter(Filter::eq("user", user.to_string()))
                    .newest_first(),
            )
            .await
    }

    async fn orders_involving(&self, vendor: UserId) -> Result<Vec<Order>, DomainError> {
        self.orders
            .find(
                self.orders
                    .query()
                    .filter(Filter::any_element("items", "vendor", vendor.to_string()))
                    .newest_first(),
            )
            .await
    }

    /// Every order with at least one of the vendor's lines, projected to those lines.
    #[tracing::instrument(skip(self))]
    pub async fn orders_for_vendor(
        &self,
        vendor: UserId,
    ) -> Result<Vec<VendorOrderView>, DomainError> {
        let orders = self.orders_involving(vendor).await?;
        Ok(orders
            .iter()
            .filter_map(|order| fulfillment::partition(order, vendor))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn vendor_dashboard(&self, vendor: UserId) -> Result<VendorDashboard, DomainError> {
        let product_count = self.catalog.count_vendor_products(vendor).await?;
        let orders = self.orders_involving(vendor).await?;
        Ok(fulfillment::dashboard(vendor, product_count, &orders))
    }

    /// Moves an order to a new status.
    ///
    /// Admins may move any order; vendors only orders containing at least
    /// one of their lines. Cancelling an order whose stock was reserved at
    /// checkout returns every line's quantity to the catalog.
    #[tracing::instrument(skip(self, cmd), fields(actor = %actor.id, order = %cmd.order_id, status = %cmd.status))]
    pub async fn set_status(&self, actor: &Actor, cmd: SetOrderStatus) -> Result<Order, DomainError> {
        let stored = self
            .orders
            .update(cmd.order_id, |order| {
                ensure_can_fulfil(actor, order)?;
                order.transition(cmd.status, cmd.note.clone(), Utc::now())?;
                Ok(())
            })
            .await?;
        let order = stored.into_inner();

        metrics::counter!("order_status_transitions_total", "status" => order.status.as_str())
            .increment(1);
        tracing::info!(order = %order.id, status = %order.status, "order status updated");

        if order.status == OrderStatus::Cancelled && order.stock_reserved {
            self.restock(&order).await;
        }
        Ok(order)
    }

    async fn restock(&self, order: &Order) {
        for item in &order.items {
            if let Err(e) = self.catalog.restore_stock(item.product, item.quantity).await {
                tracing::warn!(
                    order = %order.id,
                    product = %item.product,
                    quantity = item.quantity,
                    error = %e,
                    "could not restore stock for cancelled order"
                );
            }
        }
    }

    /// Removes delivered orders.
    ///
    /// Admins clear every delivered order. Vendors clear delivered orders
    /// made up solely of their own lines; shared ones are counted as skipped.
    #[tracing::instrument(skip(self), fields(actor = %actor.id))]
    pub async fn clear_delivered(&self, actor: &Actor) -> Result<ClearedOrders, DomainError> {
        let delivered = self
            .orders
            .query()
            .filter(Filter::eq("status", OrderStatus::Delivered.as_str()));

        let cleared = match actor.role {
            Role::Admin => ClearedOrders {
                deleted: self.orders.delete_matching(delivered).await?,
                skipped: 0,
            },
            Role::Vendor => {
                let vendor = actor.id.to_string();
                let involved = self
                    .orders
                    .count(
                        delivered
                            .clone()
                            .filter(Filter::any_element("items", "vendor", vendor.clone())),
                    )
                    .await?;
                let deleted = self
                    .orders
                    .delete_matching(delivered.filter(Filter::all_elements("items", "vendor", vendor)))
                    .await?;
                ClearedOrders {
                    deleted,
                    skipped: involved.saturating_sub(deleted),
                }
            }
            Role::Customer => return Err(OrderError::NotEntitled.into()),
        };

        tracing::info!(deleted = cleared.deleted, skipped = cleared.skipped, "delivered orders cleared");
        Ok(cleared)
    }
}

fn ensure_can_fulfil(actor: &Actor, order: &Order) -> Result<(), DomainError> {
    let entitled = match actor.role {
        Role::Admin => true,
        Role::Vendor => order.involves_vendor(actor.id),
        Role::Customer => false,
    };
    if entitled {
        Ok(())
    } else {
        Err(OrderError::NotEntitled.into())
    }
}
