use dashmap::DashMap;
use async_trait::async_trait;
use uuid::Uuid;

use super::{OrderPatch, OrderStore, StoreError};
use crate::models::Order;

/// Reference store backed by a concurrent map. The map locks per key, so
/// the version check and patch application in `update_order` are atomic
/// per order id, which is exactly the serialization the services need.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: DashMap<Uuid, Order>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn get_order(&self, order_id: Uuid) -> Result<Order, StoreError> {
        self.orders
            .get(&order_id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn get_order_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Order, StoreError> {
        self.orders
            .iter()
            .find(|entry| entry.value().payment_intent_id.as_deref() == Some(payment_intent_id))
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn update_order(
        &self,
        order_id: Uuid,
        patch: OrderPatch,
        expected_version: Option<i64>,
    ) -> Result<Order, StoreError> {
        let mut entry = self.orders.get_mut(&order_id).ok_or(StoreError::NotFound)?;
        if let Some(expected) = expected_version {
            if entry.version != expected {
                return Err(StoreError::VersionConflict);
            }
        }
        let order = entry.value_mut();
        if let Some(items) = patch.items {
            order.items = items;
        }
        if let Some(status) = patch.order_status {
            order.order_status = status;
        }
        if let Some(payment_status) = patch.payment_status {
            order.payment_status = payment_status;
        }
        if let Some(updated_at) = patch.updated_at {
            order.updated_at = updated_at;
        }
        order.version += 1;
        Ok(order.clone())
    }
}
