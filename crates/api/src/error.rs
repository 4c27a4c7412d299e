//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use event_bus::BusError;

use crate::store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// The broker rejected an operation.
    Broker(BusError),
    /// An upstream service could not be reached.
    BadGateway(String),
    /// The order store failed.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Broker(err) => broker_error_to_response(err),
            ApiError::BadGateway(msg) => {
                tracing::warn!(error = %msg, "upstream unavailable");
                (StatusCode::BAD_GATEWAY, msg)
            }
            ApiError::Store(err) => {
                tracing::error!(error = %err, "order store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn broker_error_to_response(err: BusError) -> (StatusCode, String) {
    tracing::error!(error = %err, "broker operation failed");
    if err.is_connection() {
        (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
    } else {
        (StatusCode::BAD_GATEWAY, err.to_string())
    }
}

impl From<BusError> for ApiError {
    fn from(err: BusError) -> Self {
        ApiError::Broker(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
