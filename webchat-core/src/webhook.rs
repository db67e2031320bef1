//! Webhook transport for chat messages.
//!
//! Provides a `WebhookBackend` trait with one production implementation:
//! - **WebhookClient**: JSON POST to the configured webhook URL via `reqwest`
//!
//! The backend makes exactly one request per call. Retrying is the job of
//! `delivery::MessageDelivery`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::WebhookConfig;
use crate::delivery::DeliveryError;

// ============================================================================
// WebhookBackend trait
// ============================================================================

/// Abstraction over the remote chat endpoint.
#[async_trait]
pub trait WebhookBackend: Send + Sync {
    /// Send one message and decode the reply. A transport failure, a
    /// non-success status, or a body that is not JSON is an error.
    async fn post(&self, request: &WebhookRequest) -> Result<WebhookReply, DeliveryError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Wire types
// ============================================================================

/// Request body: `{"message": ..., "session_id": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookRequest {
    pub message: String,
    pub session_id: String,
}

/// Decoded webhook reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookReply {
    /// A non-empty array reply. One slot per array element; `None` marks an
    /// element without a usable `paragraph`. Slots keep their array index so
    /// reveal timing stays keyed to position.
    Paragraphs(Vec<Option<String>>),

    /// Any other reply shape, reduced to a single text.
    Text(String),
}

/// Text used when a reply carries nothing displayable.
pub const FALLBACK_REPLY: &str = "Thank you for your message.";

impl WebhookReply {
    /// Interpret an arbitrary JSON reply.
    ///
    /// `[{"paragraph": "..."}, ...]` becomes `Paragraphs` with trimmed text.
    /// A paragraph that is blank after trimming leaves an empty slot rather
    /// than an empty bot message.
    /// Everything else becomes `Text`, taken from a non-empty string
    /// `response` field or falling back to `FALLBACK_REPLY`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) if !items.is_empty() => WebhookReply::Paragraphs(
                items
                    .iter()
                    .map(|item| {
                        item.get("paragraph")
                            .and_then(Value::as_str)
                            .map(str::trim)
                            .filter(|p| !p.is_empty())
                            .map(str::to_string)
                    })
                    .collect(),
            ),
            other => {
                let text = other
                    .get("response")
                    .and_then(Value::as_str)
                    .filter(|r| !r.is_empty())
                    .unwrap_or(FALLBACK_REPLY);
                WebhookReply::Text(text.to_string())
            }
        }
    }
}

// ============================================================================
// WebhookClient
// ============================================================================

/// HTTP webhook client.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
    url: String,
}

impl WebhookClient {
    pub fn new(config: &WebhookConfig) -> Result<Self, DeliveryError> {
        Self::with_url(config.url.clone(), Duration::from_secs(config.timeout_seconds))
    }

    /// Create a client for an explicit URL (for testing / alternate endpoints)
    pub fn with_url(url: String, timeout: Duration) -> Result<Self, DeliveryError> {
        if url.trim().is_empty() {
            return Err(DeliveryError::MissingUrl);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl WebhookBackend for WebhookClient {
    async fn post(&self, request: &WebhookRequest) -> Result<WebhookReply, DeliveryError> {
        let response = self.client.post(&self.url).json(request).send().await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(code = status.as_u16(), body = %body, "Webhook returned error status");
            return Err(DeliveryError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body).map_err(DeliveryError::InvalidBody)?;

        Ok(WebhookReply::from_value(value))
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

// ============================================================================
// TESTS
// ============================================================================
