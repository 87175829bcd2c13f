//! Checkout error types.

use common::CheckoutId;
use doc_store::StoreError;
use domain::{DomainError, ErrorKind};
use thiserror::Error;

use crate::session::CheckoutStep;

/// Errors that can occur during checkout and provider calls.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A step failed and completed steps were compensated.
    #[error("Checkout {checkout} failed at step '{step}': {source}")]
    Aborted {
        checkout: CheckoutId,
        step: CheckoutStep,
        #[source]
        source: Box<CheckoutError>,
    },

    /// Payment provider error.
    #[error("Payment provider error: {0}")]
    Payment(String),

    /// Email provider error.
    #[error("Email provider error: {0}")]
    Email(String),

    /// Image host error.
    #[error("Image host error: {0}")]
    ImageHost(String),

    /// Domain error.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Document store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Aborted { source, .. } => source.kind(),
            CheckoutError::Payment(_) | CheckoutError::Email(_) | CheckoutError::ImageHost(_) => {
                ErrorKind::Upstream
            }
            CheckoutError::Domain(e) => e.kind(),
            CheckoutError::Store(StoreError::NotFound { .. }) => ErrorKind::NotFound,
            CheckoutError::Store(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;
    use domain::CatalogError;

    #[test]
    fn aborted_checkout_keeps_the_cause_kind() {
        let cause = CheckoutError::Domain(
            CatalogError::InsufficientStock {
                product: common::ProductId::new(),
                requested: 5,
                available: 3,
            }
            .into(),
        );
        let err = CheckoutError::Aborted {
            checkout: CheckoutId::new(),
            step: CheckoutStep::ReserveStock,
            source: Box::new(cause),
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let declined = CheckoutError::Aborted {
            checkout: CheckoutId::new(),
            step: CheckoutStep::CapturePayment,
            source: Box::new(CheckoutError::Payment("declined".into())),
        };
        assert_eq!(declined.kind(), ErrorKind::Upstream);
    }
}
