//! Payment service trait, HTTP client and in-memory implementation.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderRecord, ServiceEndpoint};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SagaError};
use crate::services::{http_client, post_json};

const SERVICE: &str = "payment";

/// Body of a payment creation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub order_id: u64,
    pub amount: f64,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl PaymentRequest {
    /// A `CREATED` payment for the full order price.
    pub fn for_order(order: &OrderRecord) -> Self {
        Self {
            order_id: order.id,
            amount: order.price,
            status: "CREATED".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Trait for payment operations.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Records a payment for a newly created order.
    async fn create_payment(&self, request: &PaymentRequest) -> Result<()>;

    /// Processes the payload of an `order.created` event.
    async fn process(&self, payload: &Value) -> Result<()>;
}

/// Payment service reached over HTTP.
///
/// `create_payment` posts to `{base}/payments`, `process` to `{base}/process`.
#[derive(Debug, Clone)]
pub struct HttpPaymentService {
    client: reqwest::Client,
    base: ServiceEndpoint,
}

impl HttpPaymentService {
    /// Creates a client whose requests time out after `timeout`.
    pub fn new(base: ServiceEndpoint, timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(http_client(timeout)?, base))
    }

    pub fn with_client(client: reqwest::Client, base: ServiceEndpoint) -> Self {
        Self { client, base }
    }

    pub fn base(&self) -> &ServiceEndpoint {
        &self.base
    }
}

#[async_trait]
impl PaymentService for HttpPaymentService {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<()> {
        post_json(&self.client, SERVICE, &self.base.join("/payments"), request).await
    }

    async fn process(&self, payload: &Value) -> Result<()> {
        post_json(&self.client, SERVICE, &self.base.join("/process"), payload).await
    }
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: Vec<PaymentRequest>,
    processed: Vec<Value>,
    fail: bool,
}

/// In-memory payment service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    /// Creates a new in-memory payment service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail every call.
    pub fn set_fail(&self, fail: bool) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).fail = fail;
    }

    /// Returns the payments created so far.
    pub fn payments(&self) -> Vec<PaymentRequest> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).payments.clone()
    }

    /// Returns the event payloads processed so far, in order.
    pub fn processed(&self) -> Vec<Value> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).processed.clone()
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.fail {
            return Err(SagaError::downstream(SERVICE, "payment declined"));
        }
        state.payments.push(request.clone());
        Ok(())
    }

    async fn process(&self, payload: &Value) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.fail {
            return Err(SagaError::downstream(SERVICE, "payment declined"));
        }
        state.processed.push(payload.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order() -> OrderRecord {
        OrderRecord {
            id: 7,
            product: "Keyboard".to_string(),
            price: 49.9,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_request_for_order() {
        let request = PaymentRequest::for_order(&order());
        assert_eq!(request.order_id, 7);
        assert_eq!(request.amount, 49.9);
        assert_eq!(request.status, "CREATED");

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["order_id"], 7);
        assert_eq!(body["status"], "CREATED");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_in_memory_records_calls() {
        let service = InMemoryPaymentService::new();
        service
            .create_payment(&PaymentRequest::for_order(&order()))
            .await
            .unwrap();
        service.process(&json!({"order_id": 1})).await.unwrap();

        assert_eq!(service.payments().len(), 1);
        assert_eq!(service.processed(), vec![json!({"order_id": 1})]);
    }

    #[tokio::test]
    async fn test_in_memory_fail() {
        let service = InMemoryPaymentService::new();
        service.set_fail(true);

        let err = service.process(&json!({})).await.unwrap_err();
        assert!(matches!(err, SagaError::Downstream { service: "payment", .. }));
        assert!(service.processed().is_empty());
    }

    #[tokio::test]
    async fn test_http_unreachable_is_downstream_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let service = HttpPaymentService::new(
            ServiceEndpoint::new(format!("http://{addr}")),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = service.process(&json!({"order_id": 1})).await.unwrap_err();
        assert!(matches!(err, SagaError::Downstream { service: "payment", .. }));
    }
}
