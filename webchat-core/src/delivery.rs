//! Message delivery: one user message in, one or more bot messages out.
//!
//! A send appends the user's message and a pending placeholder, posts to the
//! webhook with exponential backoff between failed attempts, then swaps the
//! placeholder for the reply. Paragraph replies are revealed one at a time,
//! `reveal_delay` apart. When every attempt fails the placeholder is replaced
//! by a fixed error notice and the send is over.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_retry::strategy::ExponentialBackoff;

use crate::config::{DeliveryConfig, RetryConfig, WebchatConfig};
use crate::conversation::Conversation;
use crate::error::WebchatError;
use crate::models::Message;
use crate::storage::FileStorage;
use crate::store::SessionStore;
use crate::webhook::{WebhookBackend, WebhookClient, WebhookReply, WebhookRequest};

/// Shown in place of a reply once retries are exhausted.
pub const CONNECTION_ERROR_REPLY: &str =
    "Sorry, there was an error connecting to the server. Please check your internet connection and try again.";

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook error ({code}): {body}")]
    Status { code: u16, body: String },

    #[error("Invalid webhook response: {0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("Missing webhook URL")]
    MissingUrl,

    #[error("All {attempts} delivery attempts failed, last error: {last}")]
    RetryExhausted {
        attempts: usize,
        #[source]
        last: Box<DeliveryError>,
    },

    #[error("Session {session_id} already has a message in flight")]
    Busy { session_id: String },

    #[error("Message is empty")]
    EmptyMessage,
}

// ============================================================================
// Backoff
// ============================================================================

/// Delays slept between consecutive failed attempts.
///
/// Yields `min(base * 2^n, max)` for `n = 0..max_retries`, so the defaults
/// give 1000, 2000, 4000 ms.
pub fn retry_delays(config: &RetryConfig) -> impl Iterator<Item = Duration> {
    let max_delay = Duration::from_millis(config.max_delay_ms);
    let first = Duration::from_millis(config.base_delay_ms).min(max_delay);

    // ExponentialBackoff yields factor * 2^k for k >= 1
    std::iter::once(first)
        .chain(
            ExponentialBackoff::from_millis(2)
                .factor(config.base_delay_ms)
                .max_delay(max_delay),
        )
        .take(config.max_retries)
}

/// Placeholder text while retry `attempt` of `max` is pending.
pub fn reconnecting_text(attempt: usize, max: usize) -> String {
    format!("Reconnecting (attempt {}/{})...", attempt, max)
}

// ============================================================================
// Observer
// ============================================================================

/// Front-end hooks fired as a send progresses. All default to no-ops.
pub trait ChatObserver: Sync {
    fn message_appended(&self, _message: &Message) {}

    fn placeholder_shown(&self, _placeholder: &Message) {}

    fn placeholder_updated(&self, _placeholder: &Message) {}

    fn placeholder_cleared(&self, _placeholder: &Message) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ChatObserver for NoopObserver {}

// ============================================================================
// MessageDelivery
// ============================================================================

/// How a send ended. Either way the placeholder is gone.
#[derive(Debug)]
pub enum DeliveryOutcome {
    Delivered {
        replies: Vec<Message>,
        attempts: usize,
    },
    Failed {
        notice: Message,
        error: DeliveryError,
    },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

pub struct MessageDelivery {
    backend: Arc<dyn WebhookBackend>,
    store: SessionStore,
    retry: RetryConfig,
    reveal_delay: Duration,
}

impl MessageDelivery {
    pub fn new(
        backend: Arc<dyn WebhookBackend>,
        store: SessionStore,
        retry: RetryConfig,
        delivery: DeliveryConfig,
    ) -> Self {
        Self {
            backend,
            store,
            retry,
            reveal_delay: delivery.reveal_delay(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Deliver `text` within `conversation`.
    ///
    /// Errors only when the send cannot start: empty text or a send already
    /// in flight. Network failures end in `DeliveryOutcome::Failed`.
    pub async fn send(
        &self,
        conversation: &mut Conversation,
        text: &str,
        observer: &dyn ChatObserver,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DeliveryError::EmptyMessage);
        }
        if conversation.is_busy() {
            return Err(DeliveryError::Busy {
                session_id: conversation.session_id().to_string(),
            });
        }

        conversation.set_busy(true);
        let session_id = conversation.session_id().to_string();

        let user = conversation.push(Message::user(&session_id, text)).clone();
        observer.message_appended(&user);

        let placeholder = conversation.show_placeholder().clone();
        observer.placeholder_shown(&placeholder);
        self.persist(conversation);

        let request = WebhookRequest {
            message: text.to_string(),
            session_id: session_id.clone(),
        };

        let result = self
            .post_with_retry(conversation, &placeholder.id, &request, observer)
            .await;

        if let Some(removed) = conversation.remove_placeholder(&placeholder.id) {
            observer.placeholder_cleared(&removed);
        }

        let outcome = match result {
            Ok((reply, attempts)) => {
                let replies = self.reveal(conversation, reply, observer).await;
                tracing::info!(
                    session_id = %session_id,
                    attempts,
                    replies = replies.len(),
                    "Message delivered"
                );
                DeliveryOutcome::Delivered { replies, attempts }
            }
            Err(error) => {
                let notice = self.append(
                    conversation,
                    Message::bot(&session_id, CONNECTION_ERROR_REPLY),
                    observer,
                );
                DeliveryOutcome::Failed { notice, error }
            }
        };

        conversation.set_busy(false);
        Ok(outcome)
    }

    /// POST until success or the retry budget runs out. Returns the reply
    /// and the number of requests made.
    async fn post_with_retry(
        &self,
        conversation: &mut Conversation,
        placeholder_id: &str,
        request: &WebhookRequest,
        observer: &dyn ChatObserver,
    ) -> Result<(WebhookReply, usize), DeliveryError> {
        let mut delays = retry_delays(&self.retry);
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            let error = match self.backend.post(request).await {
                Ok(reply) => return Ok((reply, attempts)),
                Err(e) => e,
            };

            tracing::warn!(
                session_id = %request.session_id,
                backend = self.backend.name(),
                attempt = attempts,
                error = %error,
                "Error sending message"
            );

            let Some(delay) = delays.next() else {
                tracing::error!(
                    session_id = %request.session_id,
                    attempts,
                    "All delivery attempts failed"
                );
                return Err(DeliveryError::RetryExhausted {
                    attempts,
                    last: Box::new(error),
                });
            };

            let text = reconnecting_text(attempts, self.retry.max_retries);
            if let Some(updated) = conversation.update_placeholder(placeholder_id, text) {
                observer.placeholder_updated(updated);
            }

            tracing::debug!(delay_ms = delay.as_millis() as u64, "Retrying after backoff");
            sleep(delay).await;
        }
    }

    /// Turn a reply into bot messages. Paragraph `i` appears `i * reveal_delay`
    /// after the first, counting slots that carry no text.
    async fn reveal(
        &self,
        conversation: &mut Conversation,
        reply: WebhookReply,
        observer: &dyn ChatObserver,
    ) -> Vec<Message> {
        let session_id = conversation.session_id().to_string();

        match reply {
            WebhookReply::Text(text) => {
                vec![self.append(conversation, Message::bot(&session_id, text), observer)]
            }
            WebhookReply::Paragraphs(paragraphs) => {
                let start = Instant::now();
                let mut revealed = Vec::new();

                for (index, paragraph) in paragraphs.into_iter().enumerate() {
                    let Some(content) = paragraph else {
                        continue;
                    };
                    if index > 0 {
                        sleep_until(start + self.reveal_delay * index as u32).await;
                    }
                    revealed.push(self.append(
                        conversation,
                        Message::bot(&session_id, content),
                        observer,
                    ));
                }

                revealed
            }
        }
    }

    fn append(
        &self,
        conversation: &mut Conversation,
        message: Message,
        observer: &dyn ChatObserver,
    ) -> Message {
        let message = conversation.push(message).clone();
        observer.message_appended(&message);
        self.persist(conversation);
        message
    }

    /// Best effort: a failed write is logged and the chat carries on.
    fn persist(&self, conversation: &Conversation) {
        if let Err(e) = self
            .store
            .save(conversation.session_id(), conversation.messages())
        {
            tracing::warn!(
                session_id = conversation.session_id(),
                error = %e,
                "Failed to persist messages"
            );
        }
    }
}

/// Wire the production webhook client and the file-backed store from config.
pub fn create_delivery(config: &WebchatConfig) -> Result<MessageDelivery, WebchatError> {
    let path = config.storage.resolved_path();
    let store = SessionStore::new(Arc::new(FileStorage::open(&path)?));
    let backend = WebhookClient::new(&config.webhook)?;

    tracing::debug!(
        url = backend.url(),
        storage = %path.display(),
        "Message delivery ready"
    );

    Ok(MessageDelivery::new(
        Arc::new(backend),
        store,
        config.retry,
        config.delivery,
    ))
}

// ============================================================================
// TESTS
// ============================================================================
