//! Order aggregate root.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{
    LineItem, OrderError, OrderStatus, PaymentInfo, PaymentStatus, PriceBreakdown, ShippingInfo,
};
use crate::entity::Entity;
use crate::money::Money;

/// One entry in an order's append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

/// A placed order and its fulfillment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,

    /// Customer who placed the order.
    pub user: UserId,

    pub shipping: ShippingInfo,

    pub items: Vec<LineItem>,

    pub payment: PaymentInfo,

    pub prices: PriceBreakdown,

    pub status: OrderStatus,

    pub timeline: Vec<TimelineEntry>,

    /// True when stock was taken for every line at checkout.
    #[serde(default)]
    pub stock_reserved: bool,

    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Order {
    type Id = OrderId;
    const COLLECTION: &'static str = "orders";
    const NAME: &'static str = "Order";

    fn id(&self) -> OrderId {
        self.id
    }
}

impl Order {
    /// Creates an order in `Processing` with a single timeline entry.
    pub fn new(
        user: UserId,
        shipping: ShippingInfo,
        items: Vec<LineItem>,
        payment: PaymentInfo,
        prices: PriceBreakdown,
        now: DateTime<Utc>,
    ) -> Self {
        let paid_at = (payment.status == PaymentStatus::Success).then_some(now);
        Self {
            id: OrderId::new(),
            user,
            shipping,
            items,
            payment,
            prices,
            status: OrderStatus::Processing,
            timeline: vec![TimelineEntry {
                status: OrderStatus::Processing,
                timestamp: now,
                note: None,
            }],
            stock_reserved: false,
            paid_at,
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
        }
    }

    /// Moves the order to `next`, if the status table allows it.
    ///
    /// Appends a timeline entry and stamps the delivered/cancelled fields.
    pub fn transition(
        &mut self,
        next: OrderStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        match next {
            OrderStatus::Delivered => self.delivered_at = Some(now),
            OrderStatus::Cancelled => {
                self.cancelled_at = Some(now);
                self.cancellation_reason = note.clone();
            }
            _ => {}
        }

        self.status = next;
        self.timeline.push(TimelineEntry {
            status: next,
            timestamp: now,
            note,
        });
        Ok(())
    }

    /// Returns true if at least one line belongs to `vendor`.
    pub fn involves_vendor(&self, vendor: UserId) -> bool {
        self.items.iter().any(|item| item.vendor == vendor)
    }

    pub fn vendor_items(&self, vendor: UserId) -> impl Iterator<Item = &LineItem> {
        self.items.iter().filter(move |item| item.vendor == vendor)
    }

    /// Sum of price * quantity over the vendor's own lines.
    pub fn vendor_subtotal(&self, vendor: UserId) -> Money {
        self.vendor_items(vendor).map(LineItem::subtotal).sum()
    }
}
