//! Checkout orchestration for the marketplace.
//!
//! A checkout runs as a sequence of steps with compensating actions:
//! 1. Reserve stock for every line
//! 2. Capture payment (skipped for cash on delivery)
//! 3. Place the order
//! 4. Send the confirmation email (best-effort)
//!
//! If any of the first three steps fails, completed steps are undone in
//! reverse order and the checkout record is marked failed.
//!
//! The crate also defines the external provider contracts (payment, email,
//! image hosting) together with in-memory implementations.

pub mod coordinator;
pub mod error;
pub mod providers;
pub mod session;

pub use coordinator::{COD_TRANSACTION_ID, CheckoutCoordinator, CheckoutReceipt};
pub use error::CheckoutError;
pub use providers::{
    EmailDispatcher, EmailMessage, ImageHost, InMemoryEmailDispatcher, InMemoryImageHost,
    InMemoryPaymentGateway, PaymentGateway, PaymentIntent, PaymentReceipt,
};
pub use session::{CheckoutSession, CheckoutState, CheckoutStep};
