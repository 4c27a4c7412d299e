//! Event bus client for the fan-out events exchange.
//!
//! The [`EventBus`] trait covers what publishers and consumers need:
//! declaring a fan-out exchange and durable queues, binding them, publishing
//! raw bodies, and subscribing to a queue. [`EventBusExt`] adds envelope
//! publishing on top.
//!
//! Two backends are provided:
//! - [`RabbitMqEventBus`]: AMQP 0.9.1 via `lapin`, with robust reconnect
//! - [`InMemoryEventBus`]: process-local broker for tests and local runs

pub mod bus;
pub mod error;
pub mod memory;
pub mod rabbitmq;

pub use bus::{Acknowledge, Delivery, EventBus, EventBusExt, QueueOptions, Subscription};
pub use error::{BusError, Result};
pub use memory::InMemoryEventBus;
pub use rabbitmq::{RabbitMqConfig, RabbitMqEventBus, ReconnectPolicy};
