use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{FulfillmentStatus, Order, OrderItem, PaymentStatus};

pub mod memory;

pub use memory::MemoryOrderStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Order not found")]
    NotFound,

    /// The record changed between read and write; re-read and re-apply.
    #[error("Version conflict")]
    VersionConflict,

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub items: Option<Vec<OrderItem>>,
    pub order_status: Option<FulfillmentStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Persistence collaborator. `update_order` must apply the expected-version
/// check and the patch as one atomic step per order id; that check is the
/// only serialization the reconciliation services rely on.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, order_id: Uuid) -> Result<Order, StoreError>;

    async fn get_order_by_payment_intent(&self, payment_intent_id: &str)
    -> Result<Order, StoreError>;

    async fn update_order(
        &self,
        order_id: Uuid,
        patch: OrderPatch,
        expected_version: Option<i64>,
    ) -> Result<Order, StoreError>;
}
