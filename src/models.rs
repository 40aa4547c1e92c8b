use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money;
use crate::status::derive_order_status;

/// Fulfillment state, shared by items and the order aggregate. The order
/// value is always derived from the items except during an explicit
/// whole-order override (cancellation, full refund).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Received,
    Ready,
    Cancelled,
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FulfillmentStatus::Received => "received",
            FulfillmentStatus::Ready => "ready",
            FulfillmentStatus::Cancelled => "cancelled",
        })
    }
}

/// Money axis, independent of fulfillment. A full refund is the only point
/// where an item-level action touches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub price_delta: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub menu_item_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub options: Vec<SelectedOption>,
    pub line_total: Decimal,
    /// `None` on records created before per-item status existed; readers
    /// fall back to the order aggregate via `status::effective_item_status`.
    pub item_status: Option<FulfillmentStatus>,
    pub refunded_amount: Option<Decimal>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl OrderItem {
    pub fn new(
        menu_item_id: Uuid,
        name: impl Into<String>,
        unit_price: Decimal,
        quantity: i32,
        options: Vec<SelectedOption>,
    ) -> Self {
        let line_total = money::line_total(unit_price, &options, quantity);
        Self {
            id: Uuid::new_v4(),
            menu_item_id,
            name: name.into(),
            unit_price,
            quantity,
            options,
            line_total,
            item_status: Some(FulfillmentStatus::Received),
            refunded_amount: None,
            refunded_at: None,
        }
    }

    /// Terminal: a cancelled item with money returned never changes again.
    pub fn is_refunded(&self) -> bool {
        self.refunded_amount.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub menu_id: Uuid,
    pub order_number: String,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub platform_fee: Decimal,
    pub total: Decimal,
    pub order_status: FulfillmentStatus,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub merchant_account_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    /// Revision counter for optimistic concurrency; bumped by the store on
    /// every successful update.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub merchant_id: Uuid,
    pub menu_id: Uuid,
    pub items: Vec<OrderItem>,
    pub payment_intent_id: Option<String>,
    pub merchant_account_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
}

impl Order {
    pub fn create(new: NewOrder, fee_percent: Decimal) -> Self {
        let totals = money::order_totals(&new.items, fee_percent);
        let id = Uuid::new_v4();
        let now = Utc::now();
        let order_status = derive_order_status(&new.items);
        Self {
            id,
            merchant_id: new.merchant_id,
            menu_id: new.menu_id,
            order_number: build_order_number(id),
            items: new.items,
            subtotal: totals.subtotal,
            platform_fee: totals.platform_fee,
            total: totals.total,
            order_status,
            payment_status: PaymentStatus::Pending,
            payment_intent_id: new.payment_intent_id,
            merchant_account_id: new.merchant_account_id,
            customer_name: new.customer_name,
            customer_email: new.customer_email,
            customer_phone: new.customer_phone,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Caller identity established by the embedding application's auth layer.
/// Services re-check ownership against it on every call.
#[derive(Debug, Clone, Copy)]
pub struct MerchantCtx {
    pub merchant_id: Uuid,
}

fn build_order_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.to_string();
    let short = &suffix[..8];
    format!("ORD-{}-{}", date, short)
}
