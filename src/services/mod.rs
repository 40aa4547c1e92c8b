pub mod order_service;
pub mod webhook_service;
