//! Best-effort side effects of order creation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::OrderRecord;
use tokio::task::JoinHandle;

use crate::error::{Result, SagaError};
use crate::services::{NotificationRequest, NotificationService, PaymentRequest, PaymentService};

/// Default deadline for each side-effect call.
pub const DEFAULT_SIDE_EFFECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of a single side-effect call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffectOutcome {
    Succeeded,
    Failed(String),
    TimedOut,
}

impl SideEffectOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::TimedOut => "timed_out",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Outcomes of the side effects run for one order.
///
/// This is observability output only; it never changes the response to the
/// caller that created the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectReport {
    pub order_id: u64,
    pub payment: SideEffectOutcome,
    pub notification: SideEffectOutcome,
}

impl SideEffectReport {
    pub fn all_succeeded(&self) -> bool {
        self.payment.is_success() && self.notification.is_success()
    }
}

/// Runs payment and notification creation after an order is committed.
///
/// Both calls run concurrently, each under its own deadline. Failures are
/// logged and counted, never retried and never compensated: the order stays
/// created whatever happens here.
pub struct OrderOrchestrator<P, N> {
    payments: Arc<P>,
    notifications: Arc<N>,
    timeout: Duration,
}

impl<P, N> Clone for OrderOrchestrator<P, N> {
    fn clone(&self) -> Self {
        Self {
            payments: Arc::clone(&self.payments),
            notifications: Arc::clone(&self.notifications),
            timeout: self.timeout,
        }
    }
}

impl<P, N> OrderOrchestrator<P, N>
where
    P: PaymentService,
    N: NotificationService,
{
    pub fn new(payments: P, notifications: N) -> Self {
        Self {
            payments: Arc::new(payments),
            notifications: Arc::new(notifications),
            timeout: DEFAULT_SIDE_EFFECT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs both side effects and waits for them.
    #[tracing::instrument(skip_all, fields(order_id = order.id))]
    pub async fn run(&self, order: &OrderRecord) -> SideEffectReport {
        let payment_request = PaymentRequest::for_order(order);
        let notification_request = NotificationRequest::for_order(order);

        let (payment, notification) = tokio::join!(
            self.attempt(
                "payment",
                order.id,
                self.payments.create_payment(&payment_request)
            ),
            self.attempt(
                "notification",
                order.id,
                self.notifications.create_notification(&notification_request)
            ),
        );

        SideEffectReport {
            order_id: order.id,
            payment,
            notification,
        }
    }

    async fn attempt<F>(&self, side_effect: &'static str, order_id: u64, call: F) -> SideEffectOutcome
    where
        F: Future<Output = Result<()>>,
    {
        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(())) => SideEffectOutcome::Succeeded,
            Ok(Err(err)) => SideEffectOutcome::Failed(err.to_string()),
            Err(_) => SideEffectOutcome::TimedOut,
        };

        metrics::counter!(
            "order_side_effects_total",
            "side_effect" => side_effect,
            "outcome" => outcome.as_str()
        )
        .increment(1);

        match &outcome {
            SideEffectOutcome::Succeeded => {
                tracing::info!(order_id, side_effect, "side effect succeeded");
            }
            SideEffectOutcome::Failed(error) => {
                tracing::error!(order_id, side_effect, error = %error, "side effect failed");
            }
            SideEffectOutcome::TimedOut => {
                let error = SagaError::Timeout {
                    service: side_effect,
                    timeout_ms: self.timeout.as_millis() as u64,
                };
                tracing::error!(order_id, side_effect, error = %error, "side effect failed");
            }
        }

        outcome
    }
}

impl<P, N> OrderOrchestrator<P, N>
where
    P: PaymentService + 'static,
    N: NotificationService + 'static,
{
    /// Runs the side effects in the background and returns immediately.
    pub fn dispatch(&self, order: OrderRecord) -> JoinHandle<SideEffectReport> {
        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.run(&order).await })
    }
}
