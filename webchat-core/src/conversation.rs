//! In-memory state of one open chat session.

use crate::models::Message;
use crate::store::SessionStore;
use crate::storage::StorageError;

/// Ordered messages of one session plus the busy flag that gates sends.
///
/// Messages only ever get appended, and at most one pending placeholder
/// exists at a time.
#[derive(Debug, Clone)]
pub struct Conversation {
    session_id: String,
    messages: Vec<Message>,
    busy: bool,
}

impl Conversation {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            busy: false,
        }
    }

    /// Resume a stored session. Stale placeholders left behind by an
    /// interrupted send are dropped.
    pub fn open(store: &SessionStore, session_id: &str) -> Result<Self, StorageError> {
        let mut messages = store.load(session_id)?;
        let before = messages.len();
        messages.retain(|m| !m.is_loading);
        if messages.len() != before {
            tracing::debug!(session_id, dropped = before - messages.len(), "Dropped stale placeholders");
        }

        Ok(Self {
            session_id: session_id.to_string(),
            messages,
            busy: false,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn pending(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_loading)
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Append a message, clamping its timestamp so history stays monotonic.
    pub(crate) fn push(&mut self, mut message: Message) -> &Message {
        if let Some(last) = self.messages.last() {
            if message.timestamp < last.timestamp {
                message.timestamp = last.timestamp;
            }
        }
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Append a new pending placeholder, or return the existing one.
    pub(crate) fn show_placeholder(&mut self) -> &Message {
        if let Some(index) = self.messages.iter().position(|m| m.is_loading) {
            return &self.messages[index];
        }
        let placeholder = Message::placeholder(&self.session_id);
        self.push(placeholder)
    }

    pub(crate) fn update_placeholder(&mut self, id: &str, content: String) -> Option<&Message> {
        let placeholder = self
            .messages
            .iter_mut()
            .find(|m| m.id == id && m.is_loading)?;
        placeholder.content = content;
        Some(placeholder)
    }

    pub(crate) fn remove_placeholder(&mut self, id: &str) -> Option<Message> {
        let index = self
            .messages
            .iter()
            .position(|m| m.id == id && m.is_loading)?;
        Some(self.messages.remove(index))
    }
}
