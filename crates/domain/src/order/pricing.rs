//! Replaceable shipping and tax rules.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Computed price breakdown of an order.
///
/// `total` always equals `items + tax + shipping`; the only constructor
/// enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub items: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

impl PriceBreakdown {
    pub fn new(items: Money, tax: Money, shipping: Money) -> Self {
        Self {
            items,
            tax,
            shipping,
            total: items + tax + shipping,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.items + self.tax + self.shipping
    }
}

/// Rule computing shipping and tax from an items subtotal.
pub trait PricingPolicy: Send + Sync {
    fn shipping(&self, items: Money) -> Money;

    fn tax(&self, items: Money) -> Money;

    fn price(&self, items: Money) -> PriceBreakdown {
        PriceBreakdown::new(items, self.tax(items), self.shipping(items))
    }
}

/// Flat shipping fee up to a free-shipping threshold, plus a percentage tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardPricing {
    /// Subtotals strictly above this ship free.
    pub free_shipping_over: Money,
    pub flat_shipping: Money,
    /// Tax rate in basis points (100 = 1%).
    pub tax_rate_bps: u32,
}

impl Default for StandardPricing {
    fn default() -> Self {
        Self {
            free_shipping_over: Money::from_units(500),
            flat_shipping: Money::from_units(50),
            tax_rate_bps: 0,
        }
    }
}

impl PricingPolicy for StandardPricing {
    fn shipping(&self, items: Money) -> Money {
        if items > self.free_shipping_over {
            Money::zero()
        } else {
            self.flat_shipping
        }
    }

    fn tax(&self, items: Money) -> Money {
        items.apply_bps(self.tax_rate_bps)
    }
}
