//! Broker topology and event type names shared by publishers and consumers.

/// Fan-out exchange every service event is published to.
pub const EVENTS_EXCHANGE: &str = "micro.events";

/// Durable queue the saga worker consumes from.
pub const EVENTS_QUEUE: &str = "micro_events_q";

/// Event type emitted when an order record has been created.
pub const ORDER_CREATED: &str = "order.created";

/// Event type given to publish bodies that do not carry their own `type`.
pub const EVENT_PUBLISHED: &str = "event.published";
