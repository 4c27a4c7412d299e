//! In-memory event bus.
//!
//! Mirrors the broker semantics the rest of the system relies on:
//! fan-out exchanges, durable queues that keep their backlog across a
//! simulated broker restart, competing consumers, and redelivery of
//! deliveries dropped without an ack.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::bus::{Acknowledge, Delivery, EventBus, QueueOptions, Subscription};
use crate::{BusError, Result};

#[derive(Debug, Clone)]
struct Message {
    body: Vec<u8>,
    redelivered: bool,
}

#[derive(Debug)]
struct MemoryQueue {
    options: QueueOptions,
    messages: Mutex<VecDeque<Message>>,
    notify: Notify,
    delivered: AtomicU64,
    acked: AtomicU64,
}

impl MemoryQueue {
    fn new(options: QueueOptions) -> Self {
        Self {
            options,
            messages: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            delivered: AtomicU64::new(0),
            acked: AtomicU64::new(0),
        }
    }

    fn messages(&self) -> MutexGuard<'_, VecDeque<Message>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_back(&self, message: Message) {
        self.messages().push_back(message);
        self.notify.notify_one();
    }

    fn push_front(&self, message: Message) {
        self.messages().push_front(message);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<Message> {
        self.messages().pop_front()
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    /// Exchange name -> bound queue names, in binding order.
    exchanges: HashMap<String, Vec<String>>,
    queues: HashMap<String, Arc<MemoryQueue>>,
}

/// Process-local broker implementing [`EventBus`].
///
/// Clones share the same broker.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventBus {
    state: Arc<Mutex<BrokerState>>,
    published: Arc<AtomicU64>,
}

impl InMemoryEventBus {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn queue(&self, queue: &str) -> Option<Arc<MemoryQueue>> {
        self.state().queues.get(queue).cloned()
    }

    /// Number of messages waiting in a queue (excluding unacked deliveries).
    pub fn queue_depth(&self, queue: &str) -> usize {
        self.queue(queue).map(|q| q.messages().len()).unwrap_or(0)
    }

    /// Number of deliveries acknowledged on a queue.
    pub fn acked_count(&self, queue: &str) -> u64 {
        self.queue(queue)
            .map(|q| q.acked.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Number of deliveries handed to consumers of a queue.
    pub fn delivered_count(&self, queue: &str) -> u64 {
        self.queue(queue)
            .map(|q| q.delivered.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Total number of publish calls accepted.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Returns true if the queue has been declared.
    pub fn has_queue(&self, queue: &str) -> bool {
        self.state().queues.contains_key(queue)
    }

    /// Simulates a broker restart.
    ///
    /// Exchanges, bindings and transient queues are lost; durable queues keep
    /// their backlog. Clients are expected to re-declare their topology.
    pub fn restart(&self) {
        let mut state = self.state();
        state.exchanges.clear();
        state.queues.retain(|_, queue| queue.options.durable);
        tracing::info!(queues = state.queues.len(), "in-memory broker restarted");
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn declare_exchange(&self, exchange: &str) -> Result<()> {
        self.state().exchanges.entry(exchange.to_string()).or_default();
        Ok(())
    }

    async fn declare_queue(&self, queue: &str, options: QueueOptions) -> Result<()> {
        let mut state = self.state();
        match state.queues.get(queue) {
            Some(existing) if existing.options != options => Err(BusError::topology(
                queue,
                "queue already declared with different durability",
            )),
            Some(_) => Ok(()),
            None => {
                state
                    .queues
                    .insert(queue.to_string(), Arc::new(MemoryQueue::new(options)));
                Ok(())
            }
        }
    }

    async fn bind(&self, queue: &str, exchange: &str) -> Result<()> {
        let mut state = self.state();
        if !state.queues.contains_key(queue) {
            return Err(BusError::topology(queue, "queue not declared"));
        }
        let bound = state
            .exchanges
            .get_mut(exchange)
            .ok_or_else(|| BusError::topology(exchange, "exchange not declared"))?;
        if !bound.iter().any(|name| name == queue) {
            bound.push(queue.to_string());
        }
        Ok(())
    }

    async fn publish_raw(&self, exchange: &str, body: Vec<u8>) -> Result<()> {
        let state = self.state();
        let bound = state
            .exchanges
            .get(exchange)
            .ok_or_else(|| BusError::publish(exchange, "exchange not declared"))?;

        for name in bound {
            if let Some(queue) = state.queues.get(name) {
                queue.push_back(Message {
                    body: body.clone(),
                    redelivered: false,
                });
            }
        }
        self.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn subscribe(&self, queue: &str) -> Result<Subscription> {
        let queue = self
            .queue(queue)
            .ok_or_else(|| BusError::consume(queue, "queue not declared"))?;

        let stream = futures_util::stream::unfold(queue, |queue| async move {
            loop {
                if let Some(message) = queue.pop() {
                    queue.delivered.fetch_add(1, Ordering::Relaxed);
                    let delivery = Delivery::new(
                        message.body.clone(),
                        message.redelivered,
                        MemoryAcker {
                            queue: Arc::clone(&queue),
                            message: Some(message),
                            acked: AtomicBool::new(false),
                        },
                    );
                    return Some((Ok(delivery), queue));
                }
                // A push between pop and here leaves a permit, so no wakeup is lost.
                queue.notify.notified().await;
            }
        });

        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Acks against an in-memory queue; requeues the message if dropped unacked.
struct MemoryAcker {
    queue: Arc<MemoryQueue>,
    message: Option<Message>,
    acked: AtomicBool,
}

#[async_trait]
impl Acknowledge for MemoryAcker {
    async fn ack(&self) -> Result<()> {
        if !self.acked.swap(true, Ordering::AcqRel) {
            self.queue.acked.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

impl Drop for MemoryAcker {
    fn drop(&mut self) {
        if self.acked.load(Ordering::Acquire) {
            return;
        }
        if let Some(mut message) = self.message.take() {
            message.redelivered = true;
            self.queue.push_front(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBusExt;
    use common::EventEnvelope;
    use futures_util::StreamExt;
    use serde_json::json;
    use std::time::Duration;

    const EXCHANGE: &str = "test.events";

    async fn next_delivery(subscription: &mut Subscription) -> Delivery {
        tokio::time::timeout(Duration::from_secs(1), subscription.next())
            .await
            .expect("delivery timed out")
            .expect("subscription ended")
            .expect("delivery failed")
    }

    async fn bus_with_queue(queue: &str) -> InMemoryEventBus {
        let bus = InMemoryEventBus::new();
        bus.declare_bound_queue(EXCHANGE, queue, QueueOptions::durable())
            .await
            .unwrap();
        bus
    }

    #[tokio::test]
    async fn test_publish_and_consume_roundtrip() {
        let bus = bus_with_queue("q").await;
        let envelope = EventEnvelope::new("order.created", json!({"order_id": 42, "amount": 10}));

        bus.publish(EXCHANGE, &envelope).await.unwrap();

        let mut subscription = bus.subscribe("q").await.unwrap();
        let delivery = next_delivery(&mut subscription).await;
        assert_eq!(EventEnvelope::from_slice(&delivery.body).unwrap(), envelope);
        assert!(!delivery.redelivered);
        delivery.ack().await.unwrap();

        assert_eq!(bus.queue_depth("q"), 0);
        assert_eq!(bus.acked_count("q"), 1);
    }

    #[tokio::test]
    async fn test_fanout_copies_to_every_bound_queue() {
        let bus = InMemoryEventBus::new();
        for queue in ["a", "b", "c"] {
            bus.declare_bound_queue(EXCHANGE, queue, QueueOptions::durable())
                .await
                .unwrap();
        }

        bus.publish_raw(EXCHANGE, b"hello".to_vec()).await.unwrap();

        for queue in ["a", "b", "c"] {
            assert_eq!(bus.queue_depth(queue), 1);
        }
        assert_eq!(bus.published_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_to_undeclared_exchange_fails() {
        let bus = InMemoryEventBus::new();
        let result = bus.publish_raw("missing", b"x".to_vec()).await;
        assert!(matches!(result, Err(BusError::Publish { .. })));
    }

    #[tokio::test]
    async fn test_unbound_exchange_drops_messages() {
        let bus = InMemoryEventBus::new();
        bus.declare_exchange(EXCHANGE).await.unwrap();
        bus.publish_raw(EXCHANGE, b"x".to_vec()).await.unwrap();
        assert_eq!(bus.published_count(), 1);
    }

    #[tokio::test]
    async fn test_competing_consumers_share_one_queue() {
        let bus = bus_with_queue("shared").await;
        let mut first = bus.subscribe("shared").await.unwrap();
        let mut second = bus.subscribe("shared").await.unwrap();

        bus.publish_raw(EXCHANGE, b"1".to_vec()).await.unwrap();
        bus.publish_raw(EXCHANGE, b"2".to_vec()).await.unwrap();

        let a = next_delivery(&mut first).await;
        let b = next_delivery(&mut second).await;
        let mut bodies = vec![a.body.clone(), b.body.clone()];
        bodies.sort();
        assert_eq!(bodies, vec![b"1".to_vec(), b"2".to_vec()]);
        a.ack().await.unwrap();
        b.ack().await.unwrap();

        assert_eq!(bus.delivered_count("shared"), 2);
        assert_eq!(bus.queue_depth("shared"), 0);
    }

    #[tokio::test]
    async fn test_unacked_delivery_is_redelivered() {
        let bus = bus_with_queue("q").await;
        bus.publish_raw(EXCHANGE, b"payload".to_vec()).await.unwrap();

        let mut subscription = bus.subscribe("q").await.unwrap();
        let delivery = next_delivery(&mut subscription).await;
        drop(delivery);

        let again = next_delivery(&mut subscription).await;
        assert_eq!(again.body, b"payload".to_vec());
        assert!(again.redelivered);
        again.ack().await.unwrap();
        assert_eq!(bus.queue_depth("q"), 0);
    }

    #[tokio::test]
    async fn test_durable_queue_survives_restart() {
        let bus = InMemoryEventBus::new();
        bus.declare_bound_queue(EXCHANGE, "durable", QueueOptions::durable())
            .await
            .unwrap();
        bus.declare_bound_queue(EXCHANGE, "transient", QueueOptions::transient())
            .await
            .unwrap();
        bus.publish_raw(EXCHANGE, b"kept".to_vec()).await.unwrap();

        bus.restart();

        assert!(bus.has_queue("durable"));
        assert!(!bus.has_queue("transient"));

        // Re-declaring rejoins the existing backlog rather than creating a new queue.
        bus.declare_bound_queue(EXCHANGE, "durable", QueueOptions::durable())
            .await
            .unwrap();
        assert_eq!(bus.queue_depth("durable"), 1);
    }

    #[tokio::test]
    async fn test_redeclare_with_different_durability_fails() {
        let bus = bus_with_queue("q").await;
        let result = bus.declare_queue("q", QueueOptions::transient()).await;
        assert!(matches!(result, Err(BusError::Topology { .. })));
    }

    #[tokio::test]
    async fn test_bind_requires_declared_topology() {
        let bus = InMemoryEventBus::new();
        assert!(bus.bind("q", EXCHANGE).await.is_err());
        bus.declare_queue("q", QueueOptions::durable()).await.unwrap();
        assert!(bus.bind("q", EXCHANGE).await.is_err());
        bus.declare_exchange(EXCHANGE).await.unwrap();
        bus.bind("q", EXCHANGE).await.unwrap();
        bus.bind("q", EXCHANGE).await.unwrap();

        bus.publish_raw(EXCHANGE, b"once".to_vec()).await.unwrap();
        assert_eq!(bus.queue_depth("q"), 1);
    }

    #[tokio::test]
    async fn test_subscriber_wakes_on_late_publish() {
        let bus = bus_with_queue("q").await;
        let mut subscription = bus.subscribe("q").await.unwrap();

        let publisher = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            publisher.publish_raw(EXCHANGE, b"late".to_vec()).await.unwrap();
        });

        let delivery = next_delivery(&mut subscription).await;
        assert_eq!(delivery.body, b"late".to_vec());
    }

    #[tokio::test]
    async fn test_subscribe_to_missing_queue_fails() {
        let bus = InMemoryEventBus::new();
        assert!(matches!(
            bus.subscribe("missing").await,
            Err(BusError::Consume { .. })
        ));
    }
}
