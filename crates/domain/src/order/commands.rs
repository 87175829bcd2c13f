//! Order commands.

use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderStatus, PaymentMethod, ShippingInfo};

/// One line of a submitted cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductId,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product: ProductId, quantity: u32) -> Self {
        Self { product, quantity }
    }
}

/// Command to turn a cart into an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The customer placing the order.
    pub user: UserId,
    pub lines: Vec<CartLine>,
    pub shipping: ShippingInfo,
    pub payment_method: PaymentMethod,
}

impl PlaceOrder {
    pub fn new(
        user: UserId,
        lines: Vec<CartLine>,
        shipping: ShippingInfo,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            user,
            lines,
            shipping,
            payment_method,
        }
    }

    /// Cart lines with repeated products merged, first occurrence order kept.
    ///
    /// Fails when a merged quantity does not fit in a `u32`.
    pub fn merged_lines(&self) -> Result<Vec<CartLine>, OrderError> {
        let mut merged: Vec<CartLine> = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            match merged.iter_mut().find(|m| m.product == line.product) {
                Some(existing) => {
                    existing.quantity = existing.quantity.checked_add(line.quantity).ok_or(
                        OrderError::InvalidQuantity {
                            product: line.product,
                            quantity: line.quantity,
                        },
                    )?;
                }
                None => merged.push(*line),
            }
        }
        Ok(merged)
    }
}

/// Command to move an order to a new status.
#[derive(Debug, Clone)]
pub struct SetOrderStatus {
    pub order_id: OrderId,
    pub status: OrderStatus,
    /// Free-text note; on cancellation it is stored as the reason.
    pub note: Option<String>,
}

impl SetOrderStatus {
    pub fn new(order_id: OrderId, status: OrderStatus) -> Self {
        Self {
            order_id,
            status,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_lines_sum_repeated_products() {
        let a = ProductId::new();
        let b = ProductId::new();
        let cmd = PlaceOrder::new(
            UserId::new(),
            vec![CartLine::new(a, 1), CartLine::new(b, 2), CartLine::new(a, 3)],
            ShippingInfo {
                name: "n".into(),
                phone: "p".into(),
                address: "a".into(),
                city: "c".into(),
                region: "r".into(),
                postal_code: "z".into(),
            },
            PaymentMethod::Cod,
        );

        let merged = cmd.merged_lines().unwrap();
        assert_eq!(merged, vec![CartLine::new(a, 4), CartLine::new(b, 2)]);
    }

    #[test]
    fn merged_quantity_overflow_is_invalid() {
        let a = ProductId::new();
        let mut cmd = PlaceOrder::new(
            UserId::new(),
            vec![CartLine::new(a, u32::MAX), CartLine::new(a, 1)],
            ShippingInfo {
                name: "n".into(),
                phone: "p".into(),
                address: "a".into(),
                city: "c".into(),
                region: "r".into(),
                postal_code: "z".into(),
            },
            PaymentMethod::Cod,
        );
        assert!(matches!(
            cmd.merged_lines(),
            Err(OrderError::InvalidQuantity { quantity: 1, .. })
        ));

        cmd.lines = vec![CartLine::new(a, 1 << 31), CartLine::new(a, 1 << 31)];
        assert!(cmd.merged_lines().is_err());
    }
}
