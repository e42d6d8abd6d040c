//! Webhook Delivery
//!
//! HTTP client posting encoded record arrays to a caller-supplied callback
//! URL. Delivery makes exactly one attempt: the caller decides what to do
//! with a failure, and the connection only logs it.

use crate::config::WebhookConfig;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::time::Duration;
use thiserror::Error;

/// Webhook delivery client
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
    timeout: Duration,
}

impl WebhookClient {
    /// Create a client with the configured request timeout
    pub fn new(config: &WebhookConfig) -> WebhookResult<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST an encoded JSON body to `url`
    pub async fn deliver(&self, url: &Url, body: Vec<u8>) -> WebhookResult<()> {
        let bytes = body.len();
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WebhookError::Timeout
                } else {
                    WebhookError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebhookError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(url = %url, bytes, status = status.as_u16(), "Webhook accepted");
        Ok(())
    }
}

/// Webhook delivery errors
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Callback returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timeout")]
    Timeout,
}

/// Result type for webhook delivery
pub type WebhookResult<T> = Result<T, WebhookError>;
