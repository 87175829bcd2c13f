//! User document and its embedded address book and vendor application.

use chrono::{DateTime, Utc};
use common::{AddressId, Role, UserId};
use serde::{Deserialize, Serialize};

use super::AccountError;
use crate::entity::Entity;
use crate::order::{OrderError, ShippingInfo};

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    #[serde(flatten)]
    pub destination: ShippingInfo,
    #[serde(default)]
    pub is_default: bool,
}

/// Address fields supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    #[serde(flatten)]
    pub destination: ShippingInfo,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressInput {
    pub fn validate(&self) -> Result<(), AccountError> {
        match self.destination.validate() {
            Ok(()) => Ok(()),
            Err(OrderError::MissingShippingField(field)) => {
                Err(AccountError::MissingAddressField(field))
            }
            Err(_) => Err(AccountError::MissingAddressField("fields")),
        }
    }
}

/// Business details submitted with a vendor application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessInfo {
    pub business_name: String,
    #[serde(default)]
    pub business_type: String,
    #[serde(default)]
    pub business_address: String,
    pub tax_id: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub description: String,
}

impl BusinessInfo {
    /// Checks the fields that gate an application.
    pub fn validate(&self) -> Result<(), AccountError> {
        if self.business_name.trim().is_empty() {
            return Err(AccountError::MissingBusinessField("name"));
        }
        if !is_valid_tax_id(&self.tax_id) {
            return Err(AccountError::InvalidTaxId);
        }
        Ok(())
    }
}

/// Exactly 13 ASCII digits.
pub(crate) fn is_valid_tax_id(tax_id: &str) -> bool {
    tax_id.len() == 13 && tax_id.bytes().all(|b| b.is_ascii_digit())
}

/// A vendor application, pending or approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorInfo {
    pub business_name: String,
    pub business_type: String,
    pub business_address: String,
    pub tax_id: String,
    pub phone_number: String,
    pub description: String,
    pub is_approved: bool,
    pub application_date: DateTime<Utc>,
    pub approved_date: Option<DateTime<Utc>>,
}

impl VendorInfo {
    pub fn pending(info: BusinessInfo, now: DateTime<Utc>) -> Self {
        Self {
            business_name: info.business_name,
            business_type: info.business_type,
            business_address: info.business_address,
            tax_id: info.tax_id,
            phone_number: info.phone_number,
            description: info.description,
            is_approved: false,
            application_date: now,
            approved_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Stored lowercased.
    pub email: String,
    /// Opaque value owned by the authentication provider.
    pub credential_hash: String,
    pub role: Role,
    #[serde(default)]
    pub addresses: Vec<Address>,
    pub vendor_info: Option<VendorInfo>,
    pub created_at: DateTime<Utc>,
}

impl Entity for User {
    type Id = UserId;
    const COLLECTION: &'static str = "users";
    const NAME: &'static str = "User";

    fn id(&self) -> UserId {
        self.id
    }
}

impl User {
    pub fn default_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|a| a.is_default)
    }

    /// Appends an address. A default address takes the flag from every other.
    pub fn add_address(&mut self, input: AddressInput) -> Result<AddressId, AccountError> {
        input.validate()?;
        let id = AddressId::new();
        if input.is_default {
            self.clear_default();
        }
        self.addresses.push(Address {
            id,
            destination: input.destination,
            is_default: input.is_default,
        });
        Ok(id)
    }

    pub fn update_address(&mut self, id: AddressId, input: AddressInput) -> Result<(), AccountError> {
        input.validate()?;
        let index = self
            .addresses
            .iter()
            .position(|a| a.id == id)
            .ok_or(AccountError::AddressNotFound(id))?;
        if input.is_default {
            self.clear_default();
        }
        self.addresses[index] = Address {
            id,
            destination: input.destination,
            is_default: input.is_default,
        };
        Ok(())
    }

    pub fn remove_address(&mut self, id: AddressId) -> Result<(), AccountError> {
        let before = self.addresses.len();
        self.addresses.retain(|a| a.id != id);
        if self.addresses.len() == before {
            return Err(AccountError::AddressNotFound(id));
        }
        Ok(())
    }

    fn clear_default(&mut self) {
        for address in &mut self.addresses {
            address.is_default = false;
        }
    }
}

/// Public view of a user. Leaves out the credential hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub addresses: Vec<Address>,
    pub vendor_info: Option<VendorInfo>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            addresses: user.addresses,
            vendor_info: user.vendor_info,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(city: &str, is_default: bool) -> AddressInput {
        AddressInput {
            destination: ShippingInfo {
                name: "Karim".into(),
                phone: "01811111111".into(),
                address: "House 4".into(),
                city: city.into(),
                region: "Chattogram".into(),
                postal_code: "4000".into(),
            },
            is_default,
        }
    }

    fn user() -> User {
        User {
            id: UserId::new(),
            name: "Karim".into(),
            email: "karim@example.com".into(),
            credential_hash: "hash".into(),
            role: Role::Customer,
            addresses: vec![],
            vendor_info: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn tax_id_must_be_thirteen_digits() {
        assert!(is_valid_tax_id("1234567890123"));
        assert!(!is_valid_tax_id("123456789012"));
        assert!(!is_valid_tax_id("12345678901234"));
        assert!(!is_valid_tax_id("12345678901a3"));
        assert!(!is_valid_tax_id("１２３４５６７８９０１２３"));
    }

    #[test]
    fn at_most_one_default_address() {
        let mut user = user();
        let first = user.add_address(input("Dhaka", true)).unwrap();
        let second = user.add_address(input("Sylhet", true)).unwrap();

        assert_eq!(user.addresses.iter().filter(|a| a.is_default).count(), 1);
        assert_eq!(user.default_address().map(|a| a.id), Some(second));

        user.update_address(first, input("Khulna", true)).unwrap();
        assert_eq!(user.default_address().map(|a| a.id), Some(first));
        assert_eq!(user.addresses.iter().filter(|a| a.is_default).count(), 1);
    }

    #[test]
    fn unknown_address_is_reported() {
        let mut user = user();
        let missing = AddressId::new();
        assert!(matches!(
            user.update_address(missing, input("Dhaka", false)),
            Err(AccountError::AddressNotFound(id)) if id == missing
        ));
        assert!(user.remove_address(missing).is_err());
    }

    #[test]
    fn blank_address_field_is_rejected() {
        let mut user = user();
        let mut bad = input("Dhaka", false);
        bad.destination.phone = String::new();
        assert!(matches!(
            user.add_address(bad),
            Err(AccountError::MissingAddressField("phone"))
        ));
        assert!(user.addresses.is_empty());
    }

    #[test]
    fn profile_omits_credential_hash() {
        let profile = UserProfile::from(user());
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("credential_hash").is_none());
    }
}
