//! Order status and payment reconciliation core for a small-business
//! ordering platform.
//!
//! The crate owns the rules that derive an aggregate order status from its
//! per-item statuses, route orders into merchant work queues, and keep
//! payment state consistent across the three write paths that can race:
//! direct merchant actions, synchronous refund calls, and asynchronous
//! payment-provider webhooks. Persistence, the payment provider, and the
//! notification channel are collaborators behind traits; the embedding
//! application wires its implementations into [`state::AppState`] and calls
//! the service functions from its route and webhook handlers.

pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod money;
pub mod notify;
pub mod services;
pub mod state;
pub mod status;
pub mod store;
