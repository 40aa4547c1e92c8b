//! Status derivation engine.
//!
//! Pure functions over the item list. The aggregate order status is never
//! authoritative on its own: services recompute it after every item-level
//! mutation and persist both in the same write.

use crate::models::{FulfillmentStatus, Order, OrderItem};

/// Aggregate precedence: all cancelled wins, then any received, then ready.
/// An empty item list should not occur for a valid order and defaults to
/// `Received`.
pub fn derive_order_status(items: &[OrderItem]) -> FulfillmentStatus {
    if items.is_empty() {
        return FulfillmentStatus::Received;
    }
    let mut any_received = false;
    let mut all_cancelled = true;
    for item in items {
        match item.item_status.unwrap_or(FulfillmentStatus::Received) {
            FulfillmentStatus::Received => {
                any_received = true;
                all_cancelled = false;
            }
            FulfillmentStatus::Ready => all_cancelled = false,
            FulfillmentStatus::Cancelled => {}
        }
    }
    if all_cancelled {
        FulfillmentStatus::Cancelled
    } else if any_received {
        FulfillmentStatus::Received
    } else {
        FulfillmentStatus::Ready
    }
}

/// Item status with the legacy fallback: records created before per-item
/// status existed inherit the order aggregate.
pub fn effective_item_status(item: &OrderItem, order_status: FulfillmentStatus) -> FulfillmentStatus {
    item.item_status.unwrap_or(order_status)
}

/// Work-queue bucket: something still waiting on the merchant.
pub fn is_active_order(order: &Order) -> bool {
    order
        .items
        .iter()
        .any(|item| effective_item_status(item, order.order_status) == FulfillmentStatus::Received)
}

/// Work-queue bucket: everything actionable is done and at least one item
/// is waiting for pickup. Fully cancelled orders land in neither bucket.
pub fn is_ready_order(order: &Order) -> bool {
    let mut any_ready = false;
    for item in &order.items {
        match effective_item_status(item, order.order_status) {
            FulfillmentStatus::Received => return false,
            FulfillmentStatus::Ready => any_ready = true,
            FulfillmentStatus::Cancelled => {}
        }
    }
    any_ready
}
