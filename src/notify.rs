use std::future::Future;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Order;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct NotifyError(pub String);

/// Customer-facing notification channel (email/SMS). Delivery is
/// best-effort: each send is attempted once at the edge transitions the
/// services define, and a failure never rolls back the state change that
/// triggered it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_ready(&self, order: &Order) -> Result<(), NotifyError>;
    async fn item_refunded(&self, order: &Order, item_id: Uuid) -> Result<(), NotifyError>;
    async fn order_refunded(&self, order: &Order) -> Result<(), NotifyError>;
}

/// Attempt once, log failure, never propagate.
pub(crate) async fn best_effort(send: impl Future<Output = Result<(), NotifyError>>, kind: &str) {
    if let Err(err) = send.await {
        tracing::warn!(error = %err, kind, "notification failed");
    }
}
