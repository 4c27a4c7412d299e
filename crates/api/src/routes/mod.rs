//! HTTP route handlers for the gateway and the orders service.

pub mod events;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod proxy;
pub mod services;
