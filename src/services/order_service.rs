use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{OrderError, OrderResult},
    models::{FulfillmentStatus, MerchantCtx, Order, OrderItem, PaymentStatus},
    money, notify,
    state::AppState,
    status::derive_order_status,
    store::{OrderPatch, StoreError},
};

/// Whether a whole-order refund moved money or found the work already done.
/// Both arms are success; callers that need to distinguish "did work" from
/// "was already done" match on the variant.
#[derive(Debug)]
pub enum RefundOutcome {
    Refunded(Order),
    AlreadyRefunded(Order),
}

impl RefundOutcome {
    pub fn order(&self) -> &Order {
        match self {
            RefundOutcome::Refunded(order) | RefundOutcome::AlreadyRefunded(order) => order,
        }
    }
}

pub async fn update_item_status(
    state: &AppState,
    merchant: &MerchantCtx,
    order_id: Uuid,
    item_id: Uuid,
    new_status: FulfillmentStatus,
) -> OrderResult<Order> {
    let mut attempts = 0;
    loop {
        let order = load_owned_order(state, merchant, order_id).await?;
        let previous = order.order_status;

        let mut items = order.items.clone();
        let item = find_item_mut(&mut items, item_id)?;
        if item.is_refunded() {
            return Err(OrderError::AlreadyRefunded);
        }
        item.item_status = Some(new_status);

        let aggregate = derive_order_status(&items);
        let patch = OrderPatch {
            items: Some(items),
            order_status: Some(aggregate),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };

        match state
            .store
            .update_order(order_id, patch, Some(order.version))
            .await
        {
            Ok(updated) => {
                notify_ready_transition(state, previous, &updated).await;
                return Ok(updated);
            }
            Err(StoreError::VersionConflict) if attempts < state.config.max_conflict_retries => {
                attempts += 1;
                tracing::debug!(%order_id, attempts, "conflicting item update, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Merchant-initiated bulk change: every non-terminal item takes the new
/// status. This is one of the explicit whole-order actions allowed to move
/// the aggregate; refunded items stay cancelled.
pub async fn update_order_status(
    state: &AppState,
    merchant: &MerchantCtx,
    order_id: Uuid,
    new_status: FulfillmentStatus,
) -> OrderResult<Order> {
    let mut attempts = 0;
    loop {
        let order = load_owned_order(state, merchant, order_id).await?;
        let previous = order.order_status;

        let mut items = order.items.clone();
        for item in &mut items {
            if !item.is_refunded() {
                item.item_status = Some(new_status);
            }
        }

        let aggregate = derive_order_status(&items);
        let patch = OrderPatch {
            items: Some(items),
            order_status: Some(aggregate),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };

        match state
            .store
            .update_order(order_id, patch, Some(order.version))
            .await
        {
            Ok(updated) => {
                notify_ready_transition(state, previous, &updated).await;
                return Ok(updated);
            }
            Err(StoreError::VersionConflict) if attempts < state.config.max_conflict_retries => {
                attempts += 1;
                tracing::debug!(%order_id, attempts, "conflicting bulk update, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Refund a single line. The gateway call completes before any mutation;
/// once it has confirmed, a write failure is an inconsistency to surface,
/// never a reason to call the gateway again.
pub async fn refund_item(
    state: &AppState,
    merchant: &MerchantCtx,
    order_id: Uuid,
    item_id: Uuid,
) -> OrderResult<Order> {
    let order = load_owned_order(state, merchant, order_id).await?;
    if order.payment_status != PaymentStatus::Succeeded {
        return Err(OrderError::InvalidPaymentState(order.payment_status));
    }
    let item = order
        .items
        .iter()
        .find(|i| i.id == item_id)
        .ok_or(OrderError::NotFound)?;
    if item.is_refunded() {
        return Err(OrderError::AlreadyRefunded);
    }
    let payment_intent_id = require_payment_intent(&order)?;

    let amount_minor = money::to_minor_units(item.line_total)?;
    let idempotency_key = item_refund_key(order_id, item_id);
    let confirmation = state
        .gateway
        .refund_partial(&payment_intent_id, amount_minor, &idempotency_key)
        .await?;

    let mut attempts = 0;
    let mut current = order;
    loop {
        let refunded_at = Utc::now();
        let mut items = current.items.clone();
        let item = find_item_mut(&mut items, item_id)?;
        if item.is_refunded() {
            // a duplicate request or the provider webhook recorded the
            // refund first; the gateway deduplicated by key, so converge
            // without a second notification
            return Ok(current);
        }
        item.item_status = Some(FulfillmentStatus::Cancelled);
        item.refunded_amount = Some(item.line_total);
        item.refunded_at = Some(refunded_at);

        let aggregate = derive_order_status(&items);
        let fully_refunded = items.iter().all(OrderItem::is_refunded);
        let patch = OrderPatch {
            items: Some(items),
            order_status: Some(aggregate),
            payment_status: fully_refunded.then_some(PaymentStatus::Refunded),
            updated_at: Some(refunded_at),
        };

        match state
            .store
            .update_order(order_id, patch, Some(current.version))
            .await
        {
            Ok(updated) => {
                if fully_refunded {
                    notify::best_effort(state.notifier.order_refunded(&updated), "order refunded")
                        .await;
                } else {
                    notify::best_effort(
                        state.notifier.item_refunded(&updated, item_id),
                        "item refunded",
                    )
                    .await;
                }
                return Ok(updated);
            }
            Err(StoreError::VersionConflict) if attempts < state.config.max_conflict_retries => {
                attempts += 1;
                current = match state.store.get_order(order_id).await {
                    Ok(order) => order,
                    Err(err) => return Err(inconsistent(&confirmation.refund_id, order_id, err)),
                };
            }
            Err(err) => return Err(inconsistent(&confirmation.refund_id, order_id, err)),
        }
    }
}

/// Whole-order refund. Converges on the same terminal state as the
/// webhook-driven full refund, and a repeat call is a success-as-no-op.
pub async fn refund_order(
    state: &AppState,
    merchant: &MerchantCtx,
    order_id: Uuid,
) -> OrderResult<RefundOutcome> {
    let order = load_owned_order(state, merchant, order_id).await?;
    if order.payment_status == PaymentStatus::Refunded {
        return Ok(RefundOutcome::AlreadyRefunded(order));
    }
    if order.payment_status != PaymentStatus::Succeeded {
        return Err(OrderError::InvalidPaymentState(order.payment_status));
    }
    let payment_intent_id = require_payment_intent(&order)?;

    let idempotency_key = order_refund_key(order_id);
    let confirmation = state
        .gateway
        .refund_full(&payment_intent_id, &idempotency_key)
        .await?;

    let mut attempts = 0;
    let mut current = order;
    loop {
        if current.payment_status == PaymentStatus::Refunded {
            // the webhook or a concurrent call finished first
            return Ok(RefundOutcome::AlreadyRefunded(current));
        }
        let refunded_at = Utc::now();
        let patch = OrderPatch {
            items: Some(cancel_all_items(&current.items, refunded_at)),
            order_status: Some(FulfillmentStatus::Cancelled),
            payment_status: Some(PaymentStatus::Refunded),
            updated_at: Some(refunded_at),
        };

        match state
            .store
            .update_order(order_id, patch, Some(current.version))
            .await
        {
            Ok(updated) => {
                notify::best_effort(state.notifier.order_refunded(&updated), "order refunded")
                    .await;
                return Ok(RefundOutcome::Refunded(updated));
            }
            Err(StoreError::VersionConflict) if attempts < state.config.max_conflict_retries => {
                attempts += 1;
                current = match state.store.get_order(order_id).await {
                    Ok(order) => order,
                    Err(err) => return Err(inconsistent(&confirmation.refund_id, order_id, err)),
                };
            }
            Err(err) => return Err(inconsistent(&confirmation.refund_id, order_id, err)),
        }
    }
}

/// Marks every line cancelled for a full refund. Items already refunded
/// individually keep their original metadata.
pub(crate) fn cancel_all_items(items: &[OrderItem], refunded_at: DateTime<Utc>) -> Vec<OrderItem> {
    items
        .iter()
        .cloned()
        .map(|mut item| {
            if !item.is_refunded() {
                item.refunded_amount = Some(item.line_total);
                item.refunded_at = Some(refunded_at);
            }
            item.item_status = Some(FulfillmentStatus::Cancelled);
            item
        })
        .collect()
}

/// Customers hear about readiness once, on the strict edge into `Ready`.
async fn notify_ready_transition(state: &AppState, previous: FulfillmentStatus, updated: &Order) {
    if previous != FulfillmentStatus::Ready && updated.order_status == FulfillmentStatus::Ready {
        notify::best_effort(state.notifier.order_ready(updated), "order ready").await;
    }
}

/// Ownership is re-checked on every call; a mismatch reads the same as a
/// missing order.
async fn load_owned_order(
    state: &AppState,
    merchant: &MerchantCtx,
    order_id: Uuid,
) -> OrderResult<Order> {
    let order = state.store.get_order(order_id).await?;
    if order.merchant_id != merchant.merchant_id {
        return Err(OrderError::NotFound);
    }
    Ok(order)
}

fn find_item_mut(items: &mut [OrderItem], item_id: Uuid) -> OrderResult<&mut OrderItem> {
    items
        .iter_mut()
        .find(|i| i.id == item_id)
        .ok_or(OrderError::NotFound)
}

fn require_payment_intent(order: &Order) -> OrderResult<String> {
    order
        .payment_intent_id
        .clone()
        .ok_or_else(|| anyhow::anyhow!("order {} has no payment intent", order.id).into())
}

fn inconsistent(refund_id: &str, order_id: Uuid, err: StoreError) -> OrderError {
    tracing::error!(
        %order_id,
        refund_id,
        error = %err,
        "refund confirmed but order update failed, manual reconciliation required"
    );
    OrderError::Inconsistent {
        refund_id: refund_id.to_string(),
        source: err,
    }
}

// Deterministic keys: a retry of the same logical refund reuses the key,
// so the gateway cannot be tricked into refunding twice.
fn item_refund_key(order_id: Uuid, item_id: Uuid) -> String {
    format!("refund:{order_id}:{item_id}")
}

fn order_refund_key(order_id: Uuid) -> String {
    format!("refund:{order_id}")
}
