//! Email dispatcher trait and in-memory implementation.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::CheckoutError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Trait for outbound email.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), CheckoutError>;
}

#[async_trait]
impl<T: EmailDispatcher + ?Sized> EmailDispatcher for Arc<T> {
    async fn send(&self, message: EmailMessage) -> Result<(), CheckoutError> {
        (**self).send(message).await
    }
}

#[derive(Debug, Default)]
struct InMemoryEmailState {
    sent: Vec<EmailMessage>,
    fail_on_send: bool,
}

/// Records messages instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailDispatcher {
    state: Arc<RwLock<InMemoryEmailState>>,
}

impl InMemoryEmailDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_send(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_send = fail;
    }

    /// Every message sent so far, oldest first.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .clone()
    }
}

#[async_trait]
impl EmailDispatcher for InMemoryEmailDispatcher {
    async fn send(&self, message: EmailMessage) -> Result<(), CheckoutError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.fail_on_send {
            return Err(CheckoutError::Email(format!(
                "Mailbox unavailable for {}",
                message.recipient
            )));
        }
        tracing::debug!(recipient = %message.recipient, subject = %message.subject, "email recorded");
        state.sent.push(message);
        Ok(())
    }
}
