//! Checkout coordinator: turns a cart into a placed, paid order.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use common::CheckoutId;
use doc_store::DocumentStore;
use domain::{
    Actor, CartLine, CatalogService, DomainError, Money, Order, OrderService, PaymentInfo,
    PaymentMethod, PaymentStatus, PlaceOrder, PricingPolicy, Repository, User,
};
use serde::Serialize;

use crate::error::{CheckoutError, Result};
use crate::providers::{EmailDispatcher, EmailMessage, PaymentGateway, PaymentIntent};
use crate::session::{CheckoutSession, CheckoutState, CheckoutStep};

/// Transaction id recorded for cash-on-delivery orders.
pub const COD_TRANSACTION_ID: &str = "COD";

/// A completed checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub checkout: CheckoutSession,
    pub order: Order,
}

/// Orchestrates checkout as a sequence of steps with compensation.
///
/// Steps run in order: reserve stock for every line, capture payment
/// (skipped for cash on delivery), place the order, then send a
/// confirmation email. A failure in any of the first three undoes the
/// completed ones in reverse order. The confirmation is best-effort.
pub struct CheckoutCoordinator<S, P, E>
where
    S: DocumentStore,
    P: PaymentGateway,
    E: EmailDispatcher,
{
    sessions: Repository<S, CheckoutSession>,
    users: Repository<S, User>,
    orders: OrderService<S>,
    catalog: CatalogService<S>,
    payment: P,
    email: E,
}

impl<S, P, E> CheckoutCoordinator<S, P, E>
where
    S: DocumentStore + Clone,
    P: PaymentGateway,
    E: EmailDispatcher,
{
    pub fn new(store: S, payment: P, email: E) -> Self {
        Self::with_orders(OrderService::new(store.clone()), store, payment, email)
    }

    pub fn with_pricing(store: S, pricing: Arc<dyn PricingPolicy>, payment: P, email: E) -> Self {
        Self::with_orders(
            OrderService::with_pricing(store.clone(), pricing),
            store,
            payment,
            email,
        )
    }

    fn with_orders(orders: OrderService<S>, store: S, payment: P, email: E) -> Self {
        Self {
            sessions: Repository::new(store.clone()),
            users: Repository::new(store.clone()),
            catalog: CatalogService::new(store),
            orders,
            payment,
            email,
        }
    }
}

impl<S, P, E> CheckoutCoordinator<S, P, E>
where
    S: DocumentStore,
    P: PaymentGateway,
    E: EmailDispatcher,
{
    /// Runs a checkout for `cmd.user`.
    ///
    /// Validation failures return before anything is reserved or recorded.
    /// Later failures return [`CheckoutError::Aborted`] after compensation;
    /// the failed checkout record stays queryable.
    #[tracing::instrument(skip(self, cmd), fields(user = %cmd.user, method = %cmd.payment_method))]
    pub async fn checkout(&self, cmd: PlaceOrder) -> Result<CheckoutReceipt> {
        let started = Instant::now();
        let order = self.orders.prepare_order(&cmd).await?;

        let mut session = CheckoutSession::start(cmd.user, cmd.payment_method, order.prices.total);
        self.sessions.insert(session.clone()).await?;
        tracing::info!(checkout = %session.id, total = %session.amount, "checkout started");

        match self.run(&mut session, order).await {
            Ok(order) => {
                session.notification_sent = self.send_confirmation(&order).await;
                if session.notification_sent {
                    session.complete_step(CheckoutStep::SendConfirmation);
                }
                session.finish(CheckoutState::Completed);
                if let Err(e) = self.save(&session).await {
                    tracing::warn!(checkout = %session.id, error = %e, "could not record completed checkout");
                }

                let duration = started.elapsed().as_secs_f64();
                metrics::histogram!("checkout_duration_seconds").record(duration);
                metrics::counter!("checkouts_total", "outcome" => "completed").increment(1);
                tracing::info!(checkout = %session.id, order = %order.id, duration, "checkout completed");

                Ok(CheckoutReceipt {
                    checkout: session,
                    order,
                })
            }
            Err((step, error)) => {
                self.compensate(&mut session, step, &error).await;

                metrics::histogram!("checkout_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                metrics::counter!("checkouts_total", "outcome" => "failed").increment(1);

                Err(CheckoutError::Aborted {
                    checkout: session.id,
                    step,
                    source: Box::new(error),
                })
            }
        }
    }

    async fn run(
        &self,
        session: &mut CheckoutSession,
        mut order: Order,
    ) -> std::result::Result<Order, (CheckoutStep, CheckoutError)> {
        // 1. Reserve stock, one atomic decrement per line.
        tracing::info!(step = %CheckoutStep::ReserveStock, "checkout step started");
        for item in &order.items {
            self.catalog
                .decrease_stock(item.product, item.quantity)
                .await
                .map_err(|e| (CheckoutStep::ReserveStock, CheckoutError::from(e)))?;
            session.reserved.push(CartLine::new(item.product, item.quantity));
        }
        session.complete_step(CheckoutStep::ReserveStock);
        self.save(session)
            .await
            .map_err(|e| (CheckoutStep::ReserveStock, e))?;

        // 2. Capture payment.
        order.payment = if session.payment_method.is_prepaid() {
            tracing::info!(step = %CheckoutStep::CapturePayment, "checkout step started");
            let receipt = self
                .payment
                .charge(session.id, session.user, order.prices.total)
                .await
                .map_err(|e| (CheckoutStep::CapturePayment, e))?;
            session.payment_id = Some(receipt.transaction_id.clone());
            session.complete_step(CheckoutStep::CapturePayment);
            self.save(session)
                .await
                .map_err(|e| (CheckoutStep::CapturePayment, e))?;
            order.paid_at = Some(Utc::now());
            PaymentInfo::succeeded(session.payment_method, receipt.transaction_id)
        } else {
            PaymentInfo {
                method: PaymentMethod::Cod,
                transaction_id: Some(COD_TRANSACTION_ID.to_string()),
                status: PaymentStatus::Pending,
            }
        };

        // 3. Place the order.
        tracing::info!(step = %CheckoutStep::PlaceOrder, "checkout step started");
        order.stock_reserved = true;
        let order = self
            .orders
            .save_new(order)
            .await
            .map_err(|e| (CheckoutStep::PlaceOrder, CheckoutError::from(e)))?;
        session.order_id = Some(order.id);
        session.complete_step(CheckoutStep::PlaceOrder);

        Ok(order)
    }

    /// Undoes completed steps in reverse order and marks the checkout failed.
    ///
    /// Compensation failures are logged and recorded on the session; they
    /// never replace the original error.
    async fn compensate(
        &self,
        session: &mut CheckoutSession,
        step: CheckoutStep,
        error: &CheckoutError,
    ) {
        tracing::warn!(checkout = %session.id, %step, %error, "checkout step failed, compensating");
        session.begin_compensation(step, error.to_string());
        if let Err(e) = self.save(session).await {
            tracing::warn!(checkout = %session.id, error = %e, "could not record compensation start");
        }

        if session.has_completed(CheckoutStep::CapturePayment)
            && let Some(transaction_id) = session.payment_id.clone()
        {
            match self.payment.refund(&transaction_id).await {
                Ok(()) => tracing::info!(checkout = %session.id, %transaction_id, "payment refunded"),
                Err(e) => {
                    tracing::error!(checkout = %session.id, %transaction_id, error = %e, "refund failed");
                    session
                        .compensation_failures
                        .push(format!("refund {transaction_id}: {e}"));
                }
            }
        }

        for line in session.reserved.clone().iter().rev() {
            if let Err(e) = self.catalog.restore_stock(line.product, line.quantity).await {
                tracing::error!(
                    checkout = %session.id,
                    product = %line.product,
                    quantity = line.quantity,
                    error = %e,
                    "stock restore failed"
                );
                session
                    .compensation_failures
                    .push(format!("restore {} x{}: {e}", line.product, line.quantity));
            }
        }

        session.finish(CheckoutState::Failed);
        if let Err(e) = self.save(session).await {
            tracing::warn!(checkout = %session.id, error = %e, "could not record failed checkout");
        }
        tracing::warn!(checkout = %session.id, reason = %error, "checkout failed");
    }

    /// Sends the order confirmation. Returns whether it went out.
    async fn send_confirmation(&self, order: &Order) -> bool {
        let user = match self.users.load(order.user).await {
            Ok(Some(stored)) => stored.into_inner(),
            Ok(None) => {
                tracing::warn!(order = %order.id, user = %order.user, "no account to notify");
                return false;
            }
            Err(e) => {
                tracing::warn!(order = %order.id, error = %e, "could not load account to notify");
                return false;
            }
        };

        let message = EmailMessage {
            recipient: user.email,
            subject: format!("Order confirmation #{}", order.id),
            body: confirmation_body(&user.name, order),
        };
        match self.email.send(message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(order = %order.id, error = %e, "order confirmation not sent");
                false
            }
        }
    }

    async fn save(&self, session: &CheckoutSession) -> Result<()> {
        self.sessions
            .update(session.id, |stored| {
                *stored = session.clone();
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Loads a checkout record for its owner or an admin.
    pub async fn get_checkout(&self, actor: &Actor, id: CheckoutId) -> Result<CheckoutSession> {
        let session = self.sessions.require(id).await?.into_inner();
        if session.user != actor.id && !actor.is_admin() {
            return Err(DomainError::forbidden("You are not allowed to view this checkout").into());
        }
        Ok(session)
    }

    /// Opens a payment intent with the provider.
    #[tracing::instrument(skip(self))]
    pub async fn payment_intent(&self, amount: Money) -> Result<PaymentIntent> {
        self.payment.create_intent(amount).await
    }

    pub fn orders(&self) -> &OrderService<S> {
        &self.orders
    }
}

fn confirmation_body(name: &str, order: &Order) -> String {
    let mut body = format!("Hi {name},\n\nThank you for your order #{}.\n\n", order.id);
    for item in &order.items {
        body.push_str(&format!(
            "{} x{} @ {}\n",
            item.name, item.quantity, item.price
        ));
    }
    body.push_str(&format!(
        "\nItems: {}\nShipping: {}\nTax: {}\nTotal: {}\n",
        order.prices.items, order.prices.shipping, order.prices.tax, order.prices.total
    ));
    body
}
