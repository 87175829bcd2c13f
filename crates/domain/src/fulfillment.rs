//! Vendor-scoped views of multi-vendor orders.
//!
//! A vendor only ever sees its own lines of a shared order, the
//! destination it has to ship to, and the order's status history. Other
//! vendors' lines, the payment descriptor and the order-wide totals are
//! left out.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::Serialize;

use crate::money::Money;
use crate::order::{LineItem, Order, OrderStatus, ShippingInfo, TimelineEntry};

/// One order as seen by a single vendor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorOrderView {
    pub id: OrderId,
    pub customer: UserId,
    pub shipping: ShippingInfo,
    /// Only the vendor's own lines.
    pub items: Vec<LineItem>,
    /// Sum of price * quantity over `items`.
    pub vendor_subtotal: Money,
    /// True when other vendors also have lines in this order.
    pub shared: bool,
    pub status: OrderStatus,
    pub timeline: Vec<TimelineEntry>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Projects an order for `vendor`, or None if the vendor has no lines in it.
pub fn partition(order: &Order, vendor: UserId) -> Option<VendorOrderView> {
    let items: Vec<LineItem> = order.vendor_items(vendor).cloned().collect();
    if items.is_empty() {
        return None;
    }

    Some(VendorOrderView {
        id: order.id,
        customer: order.user,
        shipping: order.shipping.clone(),
        vendor_subtotal: items.iter().map(LineItem::subtotal).sum(),
        shared: items.len() < order.items.len(),
        items,
        status: order.status,
        timeline: order.timeline.clone(),
        delivered_at: order.delivered_at,
        cancelled_at: order.cancelled_at,
        created_at: order.created_at,
    })
}

/// Sales summary for a vendor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorDashboard {
    pub product_count: u64,
    /// Distinct orders containing at least one of the vendor's lines.
    pub total_orders: u64,
    /// Sum of price * quantity over the vendor's own lines only.
    pub total_sales: Money,
    /// Number of those orders in each status.
    pub order_status_count: BTreeMap<String, u64>,
}

/// Aggregates the dashboard from every order that may involve `vendor`.
///
/// Orders without the vendor's lines are ignored, and each order counts
/// once no matter how many of its lines belong to the vendor.
pub fn dashboard<'a>(
    vendor: UserId,
    product_count: u64,
    orders: impl IntoIterator<Item = &'a Order>,
) -> VendorDashboard {
    let mut seen = HashSet::new();
    let mut total_sales = Money::zero();
    let mut order_status_count: BTreeMap<String, u64> = OrderStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();

    for order in orders {
        if !order.involves_vendor(vendor) || !seen.insert(order.id) {
            continue;
        }
        total_sales += order.vendor_subtotal(vendor);
        *order_status_count
            .entry(order.status.as_str().to_string())
            .or_default() += 1;
    }

    VendorDashboard {
        product_count,
        total_orders: seen.len() as u64,
        total_sales,
        order_status_count,
    }
}
