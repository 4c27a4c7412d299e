//! Event-driven saga for order creation.
//!
//! Two paths react to a new order:
//!
//! - [`OrderOrchestrator`] runs inside the order-creation request, after the
//!   order is committed, and makes best-effort payment and notification calls
//! - [`SagaWorker`] consumes `order.created` events from the bound queue and
//!   asks the payment service to process them
//!
//! Neither path compensates or retries. A failed side effect is logged and
//! counted; the order itself is never rolled back.

pub mod error;
pub mod orchestrator;
pub mod services;
pub mod worker;

pub use error::{Result, SagaError};
pub use orchestrator::{
    DEFAULT_SIDE_EFFECT_TIMEOUT, OrderOrchestrator, SideEffectOutcome, SideEffectReport,
};
pub use services::{
    HttpNotificationService, HttpPaymentService, InMemoryNotificationService,
    InMemoryPaymentService, NotificationRequest, NotificationService, PaymentRequest,
    PaymentService,
};
pub use worker::{MessageOutcome, SagaWorker, WorkerSummary};
