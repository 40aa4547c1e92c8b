#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use ordering_core::{
    config::AppConfig,
    gateway::{GatewayError, InvalidSignature, PaymentGateway, RefundConfirmation, WebhookEvent},
    models::{MerchantCtx, NewOrder, Order, OrderItem, PaymentStatus},
    notify::{Notifier, NotifyError},
    state::AppState,
    store::{MemoryOrderStore, OrderPatch, OrderStore, StoreError},
};

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Gateway double: records calls and idempotency keys, and can be primed
/// to fail the next refund.
#[derive(Default)]
pub struct MockGateway {
    /// Successful partial refunds.
    pub partial_calls: AtomicUsize,
    /// Successful full refunds.
    pub full_calls: AtomicUsize,
    keys: Mutex<Vec<String>>,
    amounts: Mutex<Vec<i64>>,
    fail_next: Mutex<Option<GatewayError>>,
}

impl MockGateway {
    pub fn fail_next(&self, err: GatewayError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    /// Idempotency keys of every attempt, failed ones included.
    pub fn recorded_keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }

    pub fn refunded_amounts(&self) -> Vec<i64> {
        self.amounts.lock().unwrap().clone()
    }

    pub fn refund_calls(&self) -> usize {
        self.partial_calls.load(Ordering::SeqCst) + self.full_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn refund_partial(
        &self,
        payment_intent_id: &str,
        amount_minor: i64,
        idempotency_key: &str,
    ) -> Result<RefundConfirmation, GatewayError> {
        self.keys.lock().unwrap().push(idempotency_key.to_string());
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }
        self.partial_calls.fetch_add(1, Ordering::SeqCst);
        self.amounts.lock().unwrap().push(amount_minor);
        Ok(RefundConfirmation {
            refund_id: format!("re_{payment_intent_id}_{amount_minor}"),
            amount_minor,
        })
    }

    async fn refund_full(
        &self,
        payment_intent_id: &str,
        idempotency_key: &str,
    ) -> Result<RefundConfirmation, GatewayError> {
        self.keys.lock().unwrap().push(idempotency_key.to_string());
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }
        self.full_calls.fetch_add(1, Ordering::SeqCst);
        Ok(RefundConfirmation {
            refund_id: format!("re_full_{payment_intent_id}"),
            amount_minor: 0,
        })
    }

    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, InvalidSignature> {
        if signature_header != "valid" {
            return Err(InvalidSignature);
        }
        serde_json::from_slice(payload).map_err(|_| InvalidSignature)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    OrderReady(Uuid),
    ItemRefunded(Uuid, Uuid),
    OrderRefunded(Uuid),
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Sent>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn order_ready(&self, order: &Order) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(Sent::OrderReady(order.id));
        Ok(())
    }

    async fn item_refunded(&self, order: &Order, item_id: Uuid) -> Result<(), NotifyError> {
        self.events
            .lock()
            .unwrap()
            .push(Sent::ItemRefunded(order.id, item_id));
        Ok(())
    }

    async fn order_refunded(&self, order: &Order) -> Result<(), NotifyError> {
        self.events
            .lock()
            .unwrap()
            .push(Sent::OrderRefunded(order.id));
        Ok(())
    }
}

pub enum FailKind {
    Backend,
    Conflict,
}

/// Store double whose writes always fail; reads pass through.
pub struct FailingStore {
    pub inner: MemoryOrderStore,
    kind: FailKind,
}

impl FailingStore {
    pub fn backend() -> Self {
        Self {
            inner: MemoryOrderStore::new(),
            kind: FailKind::Backend,
        }
    }

    pub fn conflict() -> Self {
        Self {
            inner: MemoryOrderStore::new(),
            kind: FailKind::Conflict,
        }
    }
}

#[async_trait]
impl OrderStore for FailingStore {
    async fn get_order(&self, order_id: Uuid) -> Result<Order, StoreError> {
        self.inner.get_order(order_id).await
    }

    async fn get_order_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Order, StoreError> {
        self.inner.get_order_by_payment_intent(payment_intent_id).await
    }

    async fn update_order(
        &self,
        _order_id: Uuid,
        _patch: OrderPatch,
        _expected_version: Option<i64>,
    ) -> Result<Order, StoreError> {
        match self.kind {
            FailKind::Backend => Err(StoreError::Backend("write path down".into())),
            FailKind::Conflict => Err(StoreError::VersionConflict),
        }
    }
}

/// Store double that lets a competing writer land right before the next
/// version-guarded update, forcing one conflict-and-retry cycle.
pub struct ContentiousStore {
    pub inner: Arc<MemoryOrderStore>,
    interleave: Mutex<Option<(Uuid, OrderPatch)>>,
}

impl ContentiousStore {
    pub fn new(inner: Arc<MemoryOrderStore>) -> Self {
        Self {
            inner,
            interleave: Mutex::new(None),
        }
    }

    pub fn interleave_next(&self, order_id: Uuid, patch: OrderPatch) {
        *self.interleave.lock().unwrap() = Some((order_id, patch));
    }
}

#[async_trait]
impl OrderStore for ContentiousStore {
    async fn get_order(&self, order_id: Uuid) -> Result<Order, StoreError> {
        self.inner.get_order(order_id).await
    }

    async fn get_order_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Order, StoreError> {
        self.inner.get_order_by_payment_intent(payment_intent_id).await
    }

    async fn update_order(
        &self,
        order_id: Uuid,
        patch: OrderPatch,
        expected_version: Option<i64>,
    ) -> Result<Order, StoreError> {
        let competing = self.interleave.lock().unwrap().take();
        if let Some((id, competing_patch)) = competing {
            self.inner.update_order(id, competing_patch, None).await?;
        }
        self.inner.update_order(order_id, patch, expected_version).await
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryOrderStore>,
    pub gateway: Arc<MockGateway>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn test_app() -> TestApp {
    let store = Arc::new(MemoryOrderStore::new());
    let gateway = Arc::new(MockGateway::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState {
        store: store.clone(),
        gateway: gateway.clone(),
        notifier: notifier.clone(),
        config: AppConfig::default(),
    };
    TestApp {
        state,
        store,
        gateway,
        notifier,
    }
}

/// Default collaborators around a custom store.
pub fn state_with(
    store: Arc<dyn OrderStore>,
    gateway: Arc<MockGateway>,
    notifier: Arc<RecordingNotifier>,
) -> AppState {
    AppState {
        store,
        gateway,
        notifier,
        config: AppConfig::default(),
    }
}

pub fn merchant() -> MerchantCtx {
    MerchantCtx {
        merchant_id: Uuid::new_v4(),
    }
}

pub fn item(name: &str, price: &str) -> OrderItem {
    OrderItem::new(Uuid::new_v4(), name, dec(price), 1, Vec::new())
}

/// An order that completed checkout and whose payment has been captured.
pub fn paid_order(merchant: &MerchantCtx, items: Vec<OrderItem>) -> Order {
    let mut order = Order::create(
        NewOrder {
            merchant_id: merchant.merchant_id,
            menu_id: Uuid::new_v4(),
            items,
            payment_intent_id: Some(format!("pi_{}", Uuid::new_v4().simple())),
            merchant_account_id: Some("acct_test".into()),
            customer_name: Some("Ada".into()),
            customer_email: Some("ada@example.com".into()),
            customer_phone: None,
        },
        AppConfig::default().platform_fee_percent,
    );
    order.payment_status = PaymentStatus::Succeeded;
    order
}
