//! Notification service trait, HTTP client and in-memory implementation.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderRecord, ServiceEndpoint};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SagaError};
use crate::services::{http_client, post_json};

const SERVICE: &str = "notification";

/// Body of a notification creation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub order_id: u64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl NotificationRequest {
    /// The "order created" notification.
    pub fn for_order(order: &OrderRecord) -> Self {
        Self {
            order_id: order.id,
            message: format!("Order {} created successfully", order.id),
            timestamp: Utc::now(),
        }
    }
}

/// Trait for notification operations.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn create_notification(&self, request: &NotificationRequest) -> Result<()>;
}

/// Notification service reached over HTTP at `{base}/notifications`.
#[derive(Debug, Clone)]
pub struct HttpNotificationService {
    client: reqwest::Client,
    base: ServiceEndpoint,
}

impl HttpNotificationService {
    pub fn new(base: ServiceEndpoint, timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(http_client(timeout)?, base))
    }

    pub fn with_client(client: reqwest::Client, base: ServiceEndpoint) -> Self {
        Self { client, base }
    }
}

#[async_trait]
impl NotificationService for HttpNotificationService {
    async fn create_notification(&self, request: &NotificationRequest) -> Result<()> {
        post_json(
            &self.client,
            SERVICE,
            &self.base.join("/notifications"),
            request,
        )
        .await
    }
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    notifications: Vec<NotificationRequest>,
    fail: bool,
}

/// In-memory notification service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationService {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail every call.
    pub fn set_fail(&self, fail: bool) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).fail = fail;
    }

    pub fn notifications(&self) -> Vec<NotificationRequest> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .notifications
            .clone()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn create_notification(&self, request: &NotificationRequest) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.fail {
            return Err(SagaError::downstream(SERVICE, "notification rejected"));
        }
        state.notifications.push(request.clone());
        Ok(())
    }
}
