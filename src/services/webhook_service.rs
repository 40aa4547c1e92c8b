use chrono::Utc;

use super::order_service::cancel_all_items;
use crate::{
    error::{OrderError, OrderResult},
    gateway::WebhookEvent,
    models::{FulfillmentStatus, PaymentStatus},
    notify,
    state::AppState,
    store::{OrderPatch, StoreError},
};

/// Whether the event changed anything. At-least-once delivery means
/// duplicates are normal; they land on `AlreadyApplied` with no further
/// side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookDisposition {
    Applied,
    AlreadyApplied,
}

/// Entry point for provider-initiated events. The signature check runs
/// before any lookup; an unverifiable payload fails closed.
pub async fn reconcile_webhook_event(
    state: &AppState,
    raw_payload: &[u8],
    signature_header: &str,
) -> OrderResult<WebhookDisposition> {
    let event = state
        .gateway
        .verify_webhook_signature(raw_payload, signature_header)
        .map_err(|_| OrderError::InvalidSignature)?;

    match event {
        WebhookEvent::PaymentIntentSucceeded { payment_intent_id } => {
            apply_payment_status(state, &payment_intent_id, PaymentStatus::Succeeded).await
        }
        WebhookEvent::PaymentIntentFailed { payment_intent_id } => {
            apply_payment_status(state, &payment_intent_id, PaymentStatus::Failed).await
        }
        WebhookEvent::ChargeRefunded { payment_intent_id } => {
            apply_charge_refunded(state, &payment_intent_id).await
        }
    }
}

async fn apply_payment_status(
    state: &AppState,
    payment_intent_id: &str,
    new_status: PaymentStatus,
) -> OrderResult<WebhookDisposition> {
    let mut attempts = 0;
    loop {
        let order = state
            .store
            .get_order_by_payment_intent(payment_intent_id)
            .await?;
        if order.payment_status == new_status {
            return Ok(WebhookDisposition::AlreadyApplied);
        }
        // a stale success or failure delivery never downgrades a refund
        if order.payment_status == PaymentStatus::Refunded {
            return Ok(WebhookDisposition::AlreadyApplied);
        }

        let patch = OrderPatch {
            payment_status: Some(new_status),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        match state
            .store
            .update_order(order.id, patch, Some(order.version))
            .await
        {
            Ok(_) => return Ok(WebhookDisposition::Applied),
            Err(StoreError::VersionConflict) if attempts < state.config.max_conflict_retries => {
                attempts += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// The provider says the whole charge is refunded; that is ground truth,
/// so in-flight item-level refund state is overwritten. The payment-status
/// gate makes the mutation and its single notification idempotent under
/// duplicate delivery.
async fn apply_charge_refunded(
    state: &AppState,
    payment_intent_id: &str,
) -> OrderResult<WebhookDisposition> {
    let mut attempts = 0;
    loop {
        let order = state
            .store
            .get_order_by_payment_intent(payment_intent_id)
            .await?;
        if order.payment_status == PaymentStatus::Refunded {
            return Ok(WebhookDisposition::AlreadyApplied);
        }

        let refunded_at = Utc::now();
        let patch = OrderPatch {
            items: Some(cancel_all_items(&order.items, refunded_at)),
            order_status: Some(FulfillmentStatus::Cancelled),
            payment_status: Some(PaymentStatus::Refunded),
            updated_at: Some(refunded_at),
        };
        match state
            .store
            .update_order(order.id, patch, Some(order.version))
            .await
        {
            Ok(updated) => {
                notify::best_effort(state.notifier.order_refunded(&updated), "order refunded")
                    .await;
                return Ok(WebhookDisposition::Applied);
            }
            Err(StoreError::VersionConflict) if attempts < state.config.max_conflict_retries => {
                attempts += 1;
                tracing::debug!(payment_intent_id, attempts, "conflicting refund webhook, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }
}
