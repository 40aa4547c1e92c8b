use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider definitively rejected the request.
    #[error("rejected by provider: {0}")]
    Rejected(String),

    /// Transport failure or ambiguous outcome. The caller may retry with
    /// the same idempotency key; a fresh key risks a double refund.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
#[error("invalid webhook signature")]
pub struct InvalidSignature;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundConfirmation {
    pub refund_id: String,
    pub amount_minor: i64,
}

/// Events the provider delivers at least once, in no guaranteed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEvent {
    #[serde(rename = "payment_intent.succeeded")]
    PaymentIntentSucceeded { payment_intent_id: String },
    #[serde(rename = "payment_intent.payment_failed")]
    PaymentIntentFailed { payment_intent_id: String },
    #[serde(rename = "charge.refunded")]
    ChargeRefunded { payment_intent_id: String },
}

/// Payment-provider collaborator. Refund amounts are minor units (cents);
/// idempotency keys are supplied by the caller so retried calls with the
/// same key cannot duplicate a financial effect.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Refund a single line of a captured payment.
    async fn refund_partial(
        &self,
        payment_intent_id: &str,
        amount_minor: i64,
        idempotency_key: &str,
    ) -> Result<RefundConfirmation, GatewayError>;

    /// Refund whatever remains of a captured payment.
    async fn refund_full(
        &self,
        payment_intent_id: &str,
        idempotency_key: &str,
    ) -> Result<RefundConfirmation, GatewayError>;

    /// Authenticate a raw webhook delivery. Runs before any lookup or
    /// mutation; unverifiable payloads fail closed.
    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, InvalidSignature>;
}
