//! User accounts: address book and the vendor onboarding workflow.

mod claim;
mod service;
mod user;

pub use claim::TaxIdClaim;
pub use service::{AccountService, Registration};
pub use user::{Address, AddressInput, BusinessInfo, User, UserProfile, VendorInfo};

use common::AddressId;
use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Tax ID must be exactly 13 digits")]
    InvalidTaxId,

    #[error("Please enter business {0}")]
    MissingBusinessField(&'static str),

    #[error("You are already a vendor")]
    AlreadyVendor,
    /// Only customer accounts can become vendors.
    #[error("Only customer accounts can apply to become vendors")]
    NotEligible,

    /// Another account already applied or sells under this tax id.
    #[error("Tax ID is already registered to another account")]
    DuplicateTaxId,

    #[error("No vendor application on file")]
    NoApplication,

    #[error("Address not found: {0}")]
    AddressNotFound(AddressId),

    #[error("Please enter address {0}")]
    MissingAddressField(&'static str),

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Please enter your name")]
    MissingName,
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccountError::AlreadyVendor
            | AccountError::NotEligible
            | AccountError::DuplicateTaxId
            | AccountError::EmailTaken => ErrorKind::Conflict,
            AccountError::AddressNotFound(_) => ErrorKind::NotFound,
            AccountError::InvalidTaxId
            | AccountError::MissingBusinessField(_)
            | AccountError::NoApplication
            | AccountError::MissingAddressField(_)
            | AccountError::InvalidEmail(_)
            | AccountError::MissingName => ErrorKind::Validation,
        }
    }
}
