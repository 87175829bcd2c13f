//! External provider contracts and in-memory implementations.

pub mod email;
pub mod images;
pub mod payment;

pub use email::{EmailDispatcher, EmailMessage, InMemoryEmailDispatcher};
pub use images::{ImageHost, InMemoryImageHost};
pub use payment::{InMemoryPaymentGateway, PaymentGateway, PaymentIntent, PaymentReceipt};
