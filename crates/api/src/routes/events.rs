//! Event publishing and broker reachability.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::EventEnvelope;
use event_bus::{EventBus, EventBusExt};
use serde::Serialize;
use serde_json::Value;

use crate::GatewayState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub published: bool,
}

/// POST /api/events/publish: publishes any JSON body to the events exchange.
///
/// An object with a string `type` is published under that type; anything
/// else is wrapped as an `event.published` event.
#[tracing::instrument(skip(state, body))]
pub async fn publish(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<Value>,
) -> Result<Json<PublishResponse>, ApiError> {
    let envelope = EventEnvelope::from_publish_body(body);

    state.bus.declare_exchange(&state.events_exchange).await?;
    state.bus.publish(&state.events_exchange, &envelope).await?;

    tracing::info!(
        exchange = %state.events_exchange,
        event_type = %envelope.event_type,
        "event published"
    );
    Ok(Json(PublishResponse { published: true }))
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BrokerStatus {
    Reachable { ok: bool, details: &'static str },
    Unreachable { ok: bool, error: String },
}

/// GET /api/rabbit: reports whether the broker accepts connections.
#[tracing::instrument(skip(state))]
pub async fn broker(State(state): State<Arc<GatewayState>>) -> Json<BrokerStatus> {
    match state.bus.health_check().await {
        Ok(()) => Json(BrokerStatus::Reachable {
            ok: true,
            details: "AMQP reachable",
        }),
        Err(err) => {
            tracing::warn!(error = %err, "broker check failed");
            Json(BrokerStatus::Unreachable {
                ok: false,
                error: err.to_string(),
            })
        }
    }
}
