//! Storage boundary for committed orders.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use common::OrderRecord;
use thiserror::Error;

/// Errors reported by an order store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Order store unavailable: {0}")]
    Unavailable(String),
}

/// Fields supplied by the caller when creating an order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub product: String,
    pub price: f64,
}

/// Keyed record store for orders.
///
/// Callers make no assumption about durability beyond a successful
/// `append` meaning the order is committed.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Commits a new order and returns it with its assigned id and timestamp.
    async fn append(&self, order: NewOrder) -> Result<OrderRecord, StoreError>;

    /// Returns every committed order, oldest first.
    async fn list(&self) -> Result<Vec<OrderRecord>, StoreError>;
}

/// Process-local order store. Ids are sequential from 1.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<Vec<OrderRecord>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn append(&self, order: NewOrder) -> Result<OrderRecord, StoreError> {
        let mut orders = self.orders.write().unwrap_or_else(PoisonError::into_inner);
        let record = OrderRecord {
            id: orders.len() as u64 + 1,
            product: order.product,
            price: order.price,
            timestamp: Utc::now(),
        };
        orders.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<OrderRecord>, StoreError> {
        Ok(self
            .orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
