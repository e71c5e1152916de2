//! Signed webhook delivery to the external controller.

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::signature::{sign, SIGNATURE_HEADER};
use super::EventSink;
use crate::models::notification::NotificationEvent;
use crate::{AppError, Result};

/// Posts notification events as signed JSON.
///
/// Each body is serialized once; the signature is computed over those exact
/// bytes and the same bytes are sent, so the receiver can verify against
/// the raw request body.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    secret: String,
}

impl WebhookNotifier {
    /// Build a notifier with the shared secret and per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Notify` if the HTTP client cannot be constructed.
    pub fn new(secret: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Notify(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            secret: secret.into(),
        })
    }

    /// Send one event. Returns `true` only on HTTP 200.
    ///
    /// Transport failures and non-200 responses are logged and reported as
    /// `false`; nothing is retried.
    pub async fn send(&self, url: &str, event: &NotificationEvent) -> bool {
        match self.try_send(url, event).await {
            Ok(status) if status == StatusCode::OK => {
                debug!(
                    task_id = event.task_id(),
                    kind = event.kind().as_str(),
                    "notification delivered"
                );
                true
            }
            Ok(status) => {
                warn!(
                    task_id = event.task_id(),
                    kind = event.kind().as_str(),
                    %status,
                    "notification rejected by receiver"
                );
                false
            }
            Err(err) => {
                warn!(
                    task_id = event.task_id(),
                    kind = event.kind().as_str(),
                    %err,
                    "notification delivery failed"
                );
                false
            }
        }
    }

    async fn try_send(&self, url: &str, event: &NotificationEvent) -> Result<StatusCode> {
        let body = event
            .to_body()
            .map_err(|err| AppError::Notify(format!("failed to serialize event: {err}")))?;
        let signature = sign(&self.secret, &body)?;

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(|err| AppError::Notify(err.to_string()))?;

        Ok(response.status())
    }
}

impl EventSink for WebhookNotifier {
    fn deliver<'a>(
        &'a self,
        target: &'a str,
        event: &'a NotificationEvent,
    ) -> BoxFuture<'a, bool> {
        Box::pin(self.send(target, event))
    }
}
