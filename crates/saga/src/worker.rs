//! Long-lived consumer that reacts to events on the bound queue.

use std::future::Future;
use std::time::Instant;

use common::EventEnvelope;
use common::topology::ORDER_CREATED;
use event_bus::EventBus;
use futures_util::StreamExt;

use crate::error::{Result, SagaError};
use crate::services::PaymentService;

/// What happened to one delivered message.
///
/// Every outcome ends with the message acknowledged: malformed messages are
/// not requeued and failed downstream calls are not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The event was dispatched and its handler succeeded.
    Handled,
    /// No handler exists for the event type.
    Ignored,
    /// The body was not a valid event envelope.
    Dropped,
    /// The handler's downstream call failed.
    DownstreamFailed,
}

impl MessageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Handled => "handled",
            Self::Ignored => "ignored",
            Self::Dropped => "dropped",
            Self::DownstreamFailed => "downstream_failed",
        }
    }
}

impl std::fmt::Display for MessageOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts of outcomes over one run of the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub handled: u64,
    pub ignored: u64,
    pub dropped: u64,
    pub downstream_failed: u64,
    pub ack_failures: u64,
}

impl WorkerSummary {
    pub fn record(&mut self, outcome: MessageOutcome) {
        match outcome {
            MessageOutcome::Handled => self.handled += 1,
            MessageOutcome::Ignored => self.ignored += 1,
            MessageOutcome::Dropped => self.dropped += 1,
            MessageOutcome::DownstreamFailed => self.downstream_failed += 1,
        }
    }

    /// Messages processed, whatever their outcome.
    pub fn total(&self) -> u64 {
        self.handled + self.ignored + self.dropped + self.downstream_failed
    }
}

/// Consumes a queue one message at a time and dispatches by event type.
///
/// `order.created` events are forwarded to the payment service's `process`
/// operation with the event payload as body. Messages are handled strictly
/// in arrival order; to scale out, run more workers on the same queue.
///
/// There is no idempotency key on the downstream call. A message that is
/// redelivered after a crash between the call and the ack is processed
/// again.
pub struct SagaWorker<B, P> {
    bus: B,
    payments: P,
    queue: String,
}

impl<B, P> SagaWorker<B, P>
where
    B: EventBus,
    P: PaymentService,
{
    pub fn new(bus: B, payments: P, queue: impl Into<String>) -> Self {
        Self {
            bus,
            payments,
            queue: queue.into(),
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Decodes one message body and runs its handler.
    ///
    /// Never fails: every problem is folded into the returned outcome.
    pub async fn handle_message(&self, body: &[u8]) -> MessageOutcome {
        let started = Instant::now();
        let outcome = self.dispatch(body).await;

        metrics::counter!("worker_messages_total", "outcome" => outcome.as_str()).increment(1);
        metrics::histogram!("worker_message_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        outcome
    }

    async fn dispatch(&self, body: &[u8]) -> MessageOutcome {
        let envelope = match decode(body) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(
                    queue = %self.queue,
                    bytes = body.len(),
                    error = %err,
                    "dropping malformed message"
                );
                return MessageOutcome::Dropped;
            }
        };

        if !envelope.is(ORDER_CREATED) {
            tracing::debug!(event_type = %envelope.event_type, "no handler for event type");
            return MessageOutcome::Ignored;
        }

        match self.payments.process(&envelope.payload).await {
            Ok(()) => {
                tracing::info!(event_type = %envelope.event_type, "payment processed");
                MessageOutcome::Handled
            }
            Err(err) => {
                tracing::error!(
                    event_type = %envelope.event_type,
                    error = %err,
                    "payment processing failed, message will not be retried"
                );
                MessageOutcome::DownstreamFailed
            }
        }
    }

    /// Consumes the queue until `shutdown` completes.
    ///
    /// Shutdown is only observed between messages, so a message that has
    /// started processing is always finished and acknowledged. Fails only if
    /// the subscription cannot be started.
    #[tracing::instrument(skip_all, fields(queue = %self.queue))]
    pub async fn run_until<F>(&self, shutdown: F) -> Result<WorkerSummary>
    where
        F: Future<Output = ()>,
    {
        let mut subscription = self.bus.subscribe(&self.queue).await?;
        let mut summary = WorkerSummary::default();
        tokio::pin!(shutdown);

        tracing::info!("worker consuming");

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, stopping worker");
                    break;
                }
                next = subscription.next() => match next {
                    Some(Ok(delivery)) => {
                        let outcome = self.handle_message(&delivery.body).await;
                        summary.record(outcome);
                        if let Err(err) = delivery.ack().await {
                            summary.ack_failures += 1;
                            tracing::warn!(error = %err, "failed to acknowledge message");
                        }
                    }
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "subscription error");
                    }
                    None => {
                        tracing::warn!("subscription ended");
                        break;
                    }
                }
            }
        }

        tracing::info!(
            handled = summary.handled,
            ignored = summary.ignored,
            dropped = summary.dropped,
            downstream_failed = summary.downstream_failed,
            "worker stopped"
        );
        Ok(summary)
    }

    /// Consumes the queue until the subscription ends.
    pub async fn run(&self) -> Result<WorkerSummary> {
        self.run_until(std::future::pending()).await
    }
}

fn decode(body: &[u8]) -> Result<EventEnvelope> {
    EventEnvelope::from_slice(body).map_err(SagaError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryPaymentService;
    use event_bus::InMemoryEventBus;
    use serde_json::json;

    fn worker(payments: InMemoryPaymentService) -> SagaWorker<InMemoryEventBus, InMemoryPaymentService> {
        SagaWorker::new(InMemoryEventBus::new(), payments, "q")
    }

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[tokio::test]
    async fn test_order_created_posts_payload() {
        let payments = InMemoryPaymentService::new();
        let worker = worker(payments.clone());

        let outcome = worker
            .handle_message(&body(json!({"type": "order.created", "payload": {"order_id": 42, "amount": 10}})))
            .await;

        assert_eq!(outcome, MessageOutcome::Handled);
        assert_eq!(payments.processed(), vec![json!({"order_id": 42, "amount": 10})]);
    }

    #[tokio::test]
    async fn test_malformed_body_is_dropped() {
        let payments = InMemoryPaymentService::new();
        let worker = worker(payments.clone());

        assert_eq!(worker.handle_message(b"not json").await, MessageOutcome::Dropped);
        assert_eq!(
            worker.handle_message(&body(json!({"payload": {}}))).await,
            MessageOutcome::Dropped
        );
        assert!(payments.processed().is_empty());
    }

    #[test]
    fn test_decode_failure_is_a_saga_error() {
        let err = decode(b"{not json").unwrap_err();
        assert!(matches!(err, SagaError::Decode(_)));
        assert!(err.to_string().starts_with("Failed to decode event"));

        assert!(matches!(decode(&body(json!({"payload": {}}))), Err(SagaError::Decode(_))));
        assert!(decode(&body(json!({"type": "order.created", "payload": {}}))).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_type_is_ignored() {
        let payments = InMemoryPaymentService::new();
        let worker = worker(payments.clone());

        let outcome = worker
            .handle_message(&body(json!({"type": "order.shipped", "payload": {}})))
            .await;

        assert_eq!(outcome, MessageOutcome::Ignored);
        assert!(payments.processed().is_empty());
    }

    #[tokio::test]
    async fn test_downstream_failure_is_reported() {
        let payments = InMemoryPaymentService::new();
        payments.set_fail(true);
        let worker = worker(payments);

        let outcome = worker
            .handle_message(&body(json!({"type": "order.created", "payload": {"order_id": 1}})))
            .await;

        assert_eq!(outcome, MessageOutcome::DownstreamFailed);
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = WorkerSummary::default();
        summary.record(MessageOutcome::Handled);
        summary.record(MessageOutcome::Dropped);
        summary.record(MessageOutcome::Dropped);
        summary.record(MessageOutcome::DownstreamFailed);

        assert_eq!(summary.handled, 1);
        assert_eq!(summary.dropped, 2);
        assert_eq!(summary.downstream_failed, 1);
        assert_eq!(summary.total(), 4);
        assert_eq!(MessageOutcome::DownstreamFailed.to_string(), "downstream_failed");
    }
}
