//! Downstream service clients and in-memory implementations.

pub mod notification;
pub mod payment;

pub use notification::{
    HttpNotificationService, InMemoryNotificationService, NotificationRequest, NotificationService,
};
pub use payment::{HttpPaymentService, InMemoryPaymentService, PaymentRequest, PaymentService};

use std::time::Duration;

use common::errors::describe;
use serde::Serialize;

use crate::error::{Result, SagaError};

/// Builds the client shared by the HTTP service implementations.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// POSTs a JSON body and treats any non-2xx answer as a failure.
pub(crate) async fn post_json<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    service: &'static str,
    url: &str,
    body: &T,
) -> Result<()> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| SagaError::downstream(service, describe(&e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SagaError::downstream(
            service,
            format!("{url} answered {status}"),
        ));
    }

    tracing::debug!(service, url, status = status.as_u16(), "downstream call succeeded");
    Ok(())
}
