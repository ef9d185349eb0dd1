//! Outbound message delivery through the HTTP messaging gateway.
//!
//! Failures are categorized per recipient so the reminder pass can
//! report them individually and keep going; one unreachable phone
//! number never aborts the batch.

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Gateway unreachable or the request never completed.
    #[error("connectivity: {0}")]
    Connectivity(String),
    /// Gateway refused because the channel is not ready to send yet.
    #[error("send window not open")]
    SendWindow,
    /// The destination number itself is unusable.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),
    #[error("gateway error: {0}")]
    Other(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, destination: &str, body: &str) -> Result<(), NotifyError>;
}

/// Notifier backed by a local messaging-gateway HTTP endpoint.
pub struct HttpNotifier {
    client: reqwest::Client,
    gateway_url: String,
}

impl HttpNotifier {
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url: gateway_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, destination: &str, body: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.gateway_url)
            .json(&serde_json::json!({ "to": destination, "message": body }))
            .send()
            .await
            .map_err(|e| NotifyError::Connectivity(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(destination, "message accepted by gateway");
            return Ok(());
        }

        Err(match status {
            StatusCode::TOO_EARLY => NotifyError::SendWindow,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                NotifyError::InvalidDestination(destination.to_string())
            }
            other => NotifyError::Other(format!("gateway returned {other}")),
        })
    }
}
