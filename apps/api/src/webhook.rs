//! Outbound completion/failure notifications.
//!
//! Delivery is best effort: callers log a [`WebhookError`] and carry on.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::info;

use crate::processing::ProcessResponse;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook URL not configured")]
    NotConfigured,

    #[error("failed to send webhook: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned non-success status: {0}")]
    Status(u16),
}

#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    url: Option<String>,
    secret: String,
}

impl WebhookClient {
    pub fn new(url: Option<String>, secret: String) -> Result<Self, WebhookError> {
        Ok(Self {
            client: Client::builder().timeout(WEBHOOK_TIMEOUT).build()?,
            url,
            secret,
        })
    }

    /// POSTs `payload` to the configured URL with the webhook bearer secret.
    pub async fn dispatch(&self, payload: &ProcessResponse) -> Result<(), WebhookError> {
        let url = self.url.as_deref().ok_or(WebhookError::NotConfigured)?;

        info!(
            "Sending webhook for document {} to {url}",
            payload.document_id
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        info!("Webhook response status: {}", status.as_u16());
        if !status.is_success() {
            return Err(WebhookError::Status(status.as_u16()));
        }
        Ok(())
    }
}
