use std::sync::Arc;

use crate::config::AppConfig;
use crate::gateway::PaymentGateway;
use crate::notify::Notifier;
use crate::store::OrderStore;

/// Collaborators handed to every service call. The embedding application
/// wires in its own store, gateway, and notifier implementations.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub config: AppConfig,
}
