//! Value objects for the order domain.

use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::OrderError;
use crate::money::Money;

/// Shipping destination captured at order time.
///
/// The same shape backs saved address-book entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub name: String,
    pub phone: String,
    #[serde(alias = "addressLine")]
    pub address: String,
    pub city: String,
    #[serde(alias = "division")]
    pub region: String,
    #[serde(alias = "postalCode")]
    pub postal_code: String,
}

impl ShippingInfo {
    /// Fails on the first blank field, in display order.
    pub fn validate(&self) -> Result<(), OrderError> {
        let fields = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("region", &self.region),
            ("postal code", &self.postal_code),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(OrderError::MissingShippingField(*field)),
            None => Ok(()),
        }
    }
}

/// A purchased product, copied from the catalog when the order was placed.
///
/// Later edits or deletion of the product never change a placed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: ProductId,
    pub name: String,
    /// Unit price at order time.
    pub price: Money,
    pub image: Option<String>,
    pub quantity: u32,
    /// Vendor owning the product at order time.
    pub vendor: UserId,
}

impl LineItem {
    /// Returns the total price for this line (quantity * price).
    pub fn subtotal(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Bkash,
    Nagad,
    Rocket,
    /// Cash on delivery.
    Cod,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Card,
        PaymentMethod::Bkash,
        PaymentMethod::Nagad,
        PaymentMethod::Rocket,
        PaymentMethod::Cod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Bkash => "bkash",
            PaymentMethod::Nagad => "nagad",
            PaymentMethod::Rocket => "rocket",
            PaymentMethod::Cod => "cod",
        }
    }

    /// True when money is collected up front through the payment provider.
    pub fn is_prepaid(&self) -> bool {
        !matches!(self, PaymentMethod::Cod)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| OrderError::UnknownPaymentMethod(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

/// Payment descriptor stored on an order. Never holds card data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    /// Provider transaction id, once one exists.
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
}

impl PaymentInfo {
    pub fn pending(method: PaymentMethod) -> Self {
        Self {
            method,
            transaction_id: None,
            status: PaymentStatus::Pending,
        }
    }

    pub fn succeeded(method: PaymentMethod, transaction_id: impl Into<String>) -> Self {
        Self {
            method,
            transaction_id: Some(transaction_id.into()),
            status: PaymentStatus::Success,
        }
    }
}
