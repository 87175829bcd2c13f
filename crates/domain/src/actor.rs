//! The authenticated identity performing an operation.

use common::{Role, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identity and role supplied by the authentication layer.
///
/// The domain trusts this value without re-verifying credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    /// Display name, snapshotted onto reviews.
    pub name: String,
}

impl Actor {
    pub fn new(id: UserId, role: Role, name: impl Into<String>) -> Self {
        Self {
            id,
            role,
            name: name.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn require_admin(&self) -> Result<(), DomainError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(DomainError::forbidden(format!(
                "Role ({}) is not allowed to access this resource",
                self.role
            )))
        }
    }

    pub fn require_seller(&self) -> Result<(), DomainError> {
        if self.role.can_sell() {
            Ok(())
        } else {
            Err(DomainError::forbidden(format!(
                "Role ({}) is not allowed to access this resource",
                self.role
            )))
        }
    }
}
