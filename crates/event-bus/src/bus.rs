use std::pin::Pin;

use async_trait::async_trait;
use common::EventEnvelope;
use futures_core::Stream;

use crate::Result;

/// Options for declaring a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
    /// A durable queue and its contents survive a broker restart.
    pub durable: bool,
}

impl QueueOptions {
    /// A queue that survives broker restarts.
    pub fn durable() -> Self {
        Self { durable: true }
    }

    /// A queue that is lost on broker restart.
    pub fn transient() -> Self {
        Self { durable: false }
    }
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self::durable()
    }
}

/// Settles a single delivery with the broker.
#[async_trait]
pub trait Acknowledge: Send + Sync {
    /// Acknowledges the delivery; the broker will not redeliver it.
    async fn ack(&self) -> Result<()>;
}

/// A message delivered from a queue, pending acknowledgement.
pub struct Delivery {
    /// Raw message body.
    pub body: Vec<u8>,
    /// True if the broker delivered this message before without an ack.
    pub redelivered: bool,
    acker: Box<dyn Acknowledge>,
}

impl Delivery {
    pub fn new(body: Vec<u8>, redelivered: bool, acker: impl Acknowledge + 'static) -> Self {
        Self {
            body,
            redelivered,
            acker: Box::new(acker),
        }
    }

    /// Acknowledges this delivery.
    pub async fn ack(self) -> Result<()> {
        self.acker.ack().await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("body_len", &self.body.len())
            .field("redelivered", &self.redelivered)
            .finish()
    }
}

/// A stream of deliveries from one queue.
///
/// Deliveries arrive in queue order. The stream only ends when the
/// subscription is dropped or the backend shuts down.
pub type Subscription = Pin<Box<dyn Stream<Item = Result<Delivery>> + Send>>;

/// Core trait for event bus backends.
///
/// Exchanges are fan-out: a message published once is copied to every bound
/// queue. Consumers subscribed to the same queue compete, so each message on
/// that queue goes to exactly one of them.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Declares a fan-out exchange. Idempotent.
    async fn declare_exchange(&self, exchange: &str) -> Result<()>;

    /// Declares a queue. Declaring an existing queue rejoins its backlog.
    async fn declare_queue(&self, queue: &str, options: QueueOptions) -> Result<()>;

    /// Binds a queue to an exchange. Idempotent.
    async fn bind(&self, queue: &str, exchange: &str) -> Result<()>;

    /// Publishes a raw body to an exchange.
    ///
    /// Fire-and-forget: no publisher confirms are requested, so a message in
    /// flight when the connection drops may be lost.
    async fn publish_raw(&self, exchange: &str, body: Vec<u8>) -> Result<()>;

    /// Starts consuming a declared queue.
    async fn subscribe(&self, queue: &str) -> Result<Subscription>;

    /// Checks that the broker is reachable.
    async fn health_check(&self) -> Result<()>;
}

/// Convenience methods built on the core [`EventBus`] operations.
#[async_trait]
pub trait EventBusExt: EventBus {
    /// Serializes an envelope and publishes it.
    async fn publish(&self, exchange: &str, envelope: &EventEnvelope) -> Result<()> {
        let body = envelope.to_bytes()?;
        self.publish_raw(exchange, body).await?;
        metrics::counter!("events_published_total").increment(1);
        tracing::debug!(exchange, event_type = %envelope.event_type, "event published");
        Ok(())
    }

    /// Declares an exchange and a queue and binds them together.
    async fn declare_bound_queue(
        &self,
        exchange: &str,
        queue: &str,
        options: QueueOptions,
    ) -> Result<()> {
        self.declare_exchange(exchange).await?;
        self.declare_queue(queue, options).await?;
        self.bind(queue, exchange).await
    }
}

// Blanket implementation for all EventBus implementations
impl<T: EventBus + ?Sized> EventBusExt for T {}
