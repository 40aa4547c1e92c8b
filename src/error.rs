use thiserror::Error;

use crate::gateway::GatewayError;
use crate::models::PaymentStatus;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum OrderError {
    /// Also covers orders that exist but belong to another merchant, so
    /// existence is never leaked to unauthorized callers.
    #[error("Not Found")]
    NotFound,

    /// The target item or order is already refunded; the requested
    /// mutation performed no write.
    #[error("Already refunded")]
    AlreadyRefunded,

    #[error("Payment not refundable from status {0}")]
    InvalidPaymentState(PaymentStatus),

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Webhook signature verification failed")]
    InvalidSignature,

    #[error("Concurrent modification, retries exhausted")]
    Conflict,

    /// The gateway confirmed a refund but the order record could not be
    /// updated. Requires manual reconciliation; never retried here because
    /// re-issuing the refund risks moving money twice.
    #[error("Refund {refund_id} confirmed but order update failed: {source}")]
    Inconsistent {
        refund_id: String,
        source: StoreError,
    },

    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => OrderError::NotFound,
            StoreError::VersionConflict => OrderError::Conflict,
            other => OrderError::Store(other),
        }
    }
}

impl OrderError {
    /// Message safe for an unauthenticated caller (guest order lookup).
    /// Gateway codes and storage detail stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            OrderError::NotFound => "Order not found",
            OrderError::AlreadyRefunded => "This item has already been refunded",
            OrderError::InvalidPaymentState(_) => "This payment cannot be refunded",
            _ => "Something went wrong, please try again later",
        }
    }

    /// Safe to retry with the same idempotency key.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            OrderError::Gateway(GatewayError::Unavailable(_)) | OrderError::Conflict
        )
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
