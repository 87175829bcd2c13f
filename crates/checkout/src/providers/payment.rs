//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::{CheckoutId, UserId};
use domain::Money;
use serde::Serialize;

use crate::error::CheckoutError;

/// A client-side payment intent.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub transaction_id: String,
    /// Handed to the client to confirm the payment with the provider.
    pub client_secret: String,
    pub amount: Money,
}

/// Result of a successful charge.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    /// The transaction ID assigned by the provider.
    pub transaction_id: String,
}

/// Trait for payment provider operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a payment intent for the client to confirm.
    async fn create_intent(&self, amount: Money) -> Result<PaymentIntent, CheckoutError>;

    /// Captures `amount` from the customer for a checkout.
    async fn charge(
        &self,
        checkout: CheckoutId,
        customer: UserId,
        amount: Money,
    ) -> Result<PaymentReceipt, CheckoutError>;

    /// Refunds a captured payment.
    async fn refund(&self, transaction_id: &str) -> Result<(), CheckoutError>;
}

#[async_trait]
impl<T: PaymentGateway + ?Sized> PaymentGateway for Arc<T> {
    async fn create_intent(&self, amount: Money) -> Result<PaymentIntent, CheckoutError> {
        (**self).create_intent(amount).await
    }

    async fn charge(
        &self,
        checkout: CheckoutId,
        customer: UserId,
        amount: Money,
    ) -> Result<PaymentReceipt, CheckoutError> {
        (**self).charge(checkout, customer, amount).await
    }

    async fn refund(&self, transaction_id: &str) -> Result<(), CheckoutError> {
        (**self).refund(transaction_id).await
    }
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: HashMap<String, (CheckoutId, UserId, Money)>,
    intents: usize,
    next_id: u32,
    fail_on_charge: bool,
    fail_on_refund: bool,
}

/// In-memory payment gateway. Charges always succeed unless told otherwise.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline charges.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_charge = fail;
    }

    pub fn set_fail_on_refund(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_refund = fail;
    }

    /// Returns the number of captured, unrefunded payments.
    pub fn payment_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .payments
            .len()
    }

    pub fn has_payment(&self, transaction_id: &str) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .payments
            .contains_key(transaction_id)
    }

    pub fn intent_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .intents
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_intent(&self, amount: Money) -> Result<PaymentIntent, CheckoutError> {
        if amount.is_negative() || amount.is_zero() {
            return Err(CheckoutError::Payment(format!(
                "Invalid payment amount: {amount}"
            )));
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.intents += 1;
        state.next_id += 1;
        let transaction_id = format!("PAY-{:04}", state.next_id);
        Ok(PaymentIntent {
            client_secret: format!("{transaction_id}_secret_{}", uuid::Uuid::new_v4().simple()),
            transaction_id,
            amount,
        })
    }

    async fn charge(
        &self,
        checkout: CheckoutId,
        customer: UserId,
        amount: Money,
    ) -> Result<PaymentReceipt, CheckoutError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.fail_on_charge {
            return Err(CheckoutError::Payment("Payment declined".to_string()));
        }

        state.next_id += 1;
        let transaction_id = format!("PAY-{:04}", state.next_id);
        state
            .payments
            .insert(transaction_id.clone(), (checkout, customer, amount));

        Ok(PaymentReceipt { transaction_id })
    }

    async fn refund(&self, transaction_id: &str) -> Result<(), CheckoutError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.fail_on_refund {
            return Err(CheckoutError::Payment(format!(
                "Refund of {transaction_id} rejected"
            )));
        }
        state.payments.remove(transaction_id);
        Ok(())
    }
}
