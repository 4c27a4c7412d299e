//! Order creation and listing for the orders service.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::OrderRecord;
use saga::{NotificationService, OrderOrchestrator, PaymentService};
use serde::{Deserialize, Serialize};

use crate::config::SideEffectsMode;
use crate::error::ApiError;
use crate::store::{NewOrder, OrderStore};

/// Shared state of the orders service.
pub struct OrdersState<S, P, N> {
    pub store: S,
    pub orchestrator: OrderOrchestrator<P, N>,
    pub side_effects: SideEffectsMode,
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default = "default_product")]
    pub product: String,
    #[serde(default)]
    pub price: f64,
}

fn default_product() -> String {
    "Unknown".to_string()
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub service: &'static str,
    pub count: usize,
    pub data: Vec<OrderRecord>,
}

// -- Handlers --

/// POST /orders: commits an order, then runs its side effects.
///
/// The response is 201 with the stored order once the store accepts it.
/// Payment and notification failures are logged and never change it.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, P, N>(
    State(state): State<Arc<OrdersState<S, P, N>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderRecord>), ApiError>
where
    S: OrderStore + 'static,
    P: PaymentService + 'static,
    N: NotificationService + 'static,
{
    if !req.price.is_finite() {
        return Err(ApiError::BadRequest("price must be a finite number".to_string()));
    }

    let order = state
        .store
        .append(NewOrder {
            product: req.product,
            price: req.price,
        })
        .await?;

    metrics::counter!("orders_created_total").increment(1);
    tracing::info!(order_id = order.id, product = %order.product, "order created");

    match state.side_effects {
        SideEffectsMode::Inline => {
            let report = state.orchestrator.run(&order).await;
            if !report.all_succeeded() {
                tracing::warn!(
                    order_id = order.id,
                    payment = report.payment.as_str(),
                    notification = report.notification.as_str(),
                    "order created with failed side effects"
                );
            }
        }
        SideEffectsMode::Detached => {
            // The report is logged by the orchestrator itself.
            drop(state.orchestrator.dispatch(order.clone()));
        }
    }

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: lists every committed order.
#[tracing::instrument(skip(state))]
pub async fn list<S, P, N>(
    State(state): State<Arc<OrdersState<S, P, N>>>,
) -> Result<Json<OrderListResponse>, ApiError>
where
    S: OrderStore + 'static,
    P: PaymentService + 'static,
    N: NotificationService + 'static,
{
    let data = state.store.list().await?;
    Ok(Json(OrderListResponse {
        service: "orders",
        count: data.len(),
        data,
    }))
}
