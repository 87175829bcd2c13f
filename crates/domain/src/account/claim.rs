//! Tax id ownership records.

use chrono::{DateTime, Utc};
use common::{DocumentId, UserId};
use serde::{Deserialize, Serialize};

use super::AccountError;
use super::user::is_valid_tax_id;
use crate::entity::Entity;

/// Marks a tax id as taken by one account.
///
/// The document id is derived from the tax id itself, so a second claim on
/// the same tax id collides on insert instead of relying on a prior read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxIdClaim {
    pub id: DocumentId,
    pub tax_id: String,
    pub holder: UserId,
    pub claimed_at: DateTime<Utc>,
}

impl TaxIdClaim {
    pub fn new(tax_id: &str, holder: UserId, now: DateTime<Utc>) -> Result<Self, AccountError> {
        Ok(Self {
            id: Self::id_for(tax_id)?,
            tax_id: tax_id.to_string(),
            holder,
            claimed_at: now,
        })
    }

    pub fn id_for(tax_id: &str) -> Result<DocumentId, AccountError> {
        if !is_valid_tax_id(tax_id) {
            return Err(AccountError::InvalidTaxId);
        }
        let key: u128 = tax_id.parse().map_err(|_| AccountError::InvalidTaxId)?;
        Ok(DocumentId::from_u128(key))
    }
}

impl Entity for TaxIdClaim {
    type Id = DocumentId;
    const COLLECTION: &'static str = "tax_ids";
    const NAME: &'static str = "Tax ID";

    fn id(&self) -> DocumentId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_tax_id_same_document() {
        let a = TaxIdClaim::new("1234567890123", UserId::new(), Utc::now()).unwrap();
        let b = TaxIdClaim::new("1234567890123", UserId::new(), Utc::now()).unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, TaxIdClaim::id_for("1234567890124").unwrap());
        assert!(TaxIdClaim::id_for("12345").is_err());
    }
}
