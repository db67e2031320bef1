//! Session store: per-session message histories on top of a key-value backend.
//!
//! Layout (compatible with the browser client's localStorage):
//! - `chatSessionId` holds the active session id
//! - `messages_<session_id>` holds the JSON-encoded message list
//!
//! Every operation takes the session id explicitly; the active-session
//! pointer is just another stored value.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{Message, SessionSummary};
use crate::storage::{KeyValueStorage, StorageError};

pub const ACTIVE_SESSION_KEY: &str = "chatSessionId";
pub const MESSAGES_KEY_PREFIX: &str = "messages_";

pub fn messages_key(session_id: &str) -> String {
    format!("{}{}", MESSAGES_KEY_PREFIX, session_id)
}

#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// The active session id, if one has been stored.
    pub fn active_session(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .storage
            .get(ACTIVE_SESSION_KEY)?
            .filter(|id| !id.trim().is_empty()))
    }

    pub fn set_active(&self, session_id: &str) -> Result<(), StorageError> {
        self.storage.set(ACTIVE_SESSION_KEY, session_id)?;
        tracing::debug!(session_id, "Active session set");
        Ok(())
    }

    /// Start a fresh session with a random id and make it active.
    ///
    /// Nothing is written under its messages key until the first message
    /// is saved, so an untouched session never shows up in listings.
    pub fn create_session(&self) -> Result<String, StorageError> {
        let session_id = Uuid::new_v4().to_string();
        self.set_active(&session_id)?;
        tracing::info!(session_id = %session_id, "Created new chat session");
        Ok(session_id)
    }

    /// The active session, creating one if none is stored.
    pub fn open_or_create(&self) -> Result<String, StorageError> {
        match self.active_session()? {
            Some(id) => Ok(id),
            None => self.create_session(),
        }
    }

    /// Message history of a session, oldest first.
    ///
    /// An unknown session yields an empty list. A malformed record is logged
    /// and also yields an empty list.
    pub fn load(&self, session_id: &str) -> Result<Vec<Message>, StorageError> {
        let raw = match self.storage.get(&messages_key(session_id))? {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };

        match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) => Ok(messages),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "Skipping malformed stored messages");
                Ok(Vec::new())
            }
        }
    }

    /// Replace a session's history. Pending placeholders are dropped and an
    /// empty history is not written.
    pub fn save(&self, session_id: &str, messages: &[Message]) -> Result<(), StorageError> {
        let persisted: Vec<&Message> = messages.iter().filter(|m| !m.is_loading).collect();
        if persisted.is_empty() {
            return Ok(());
        }

        let encoded = serde_json::to_string(&persisted)?;
        self.storage.set(&messages_key(session_id), &encoded)
    }

    /// Append one message to a stored history.
    pub fn append(&self, session_id: &str, message: &Message) -> Result<(), StorageError> {
        let mut messages = self.load(session_id)?;
        messages.push(message.clone());
        self.save(session_id, &messages)
    }

    /// Remove a session's history. When it was the active session, a fresh
    /// session is created, activated, and its id returned.
    pub fn delete_session(&self, session_id: &str) -> Result<Option<String>, StorageError> {
        self.storage.remove(&messages_key(session_id))?;
        tracing::info!(session_id, "Deleted chat session");

        if self.active_session()?.as_deref() == Some(session_id) {
            return self.create_session().map(Some);
        }
        Ok(None)
    }

    /// Summaries of every stored session, most recently updated first.
    ///
    /// Sessions with equal last-updated times keep the storage's key order.
    /// Malformed records are logged and skipped.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>, StorageError> {
        let now = Utc::now();
        let mut sessions = Vec::new();

        for key in self.storage.keys()? {
            let Some(session_id) = key.strip_prefix(MESSAGES_KEY_PREFIX) else {
                continue;
            };
            let Some(raw) = self.storage.get(&key)? else {
                continue;
            };

            match serde_json::from_str::<Vec<Message>>(&raw) {
                Ok(messages) => {
                    sessions.push(SessionSummary::from_messages(session_id, &messages, now));
                }
                Err(e) => {
                    tracing::warn!(session_id, error = %e, "Error parsing session data, skipping");
                }
            }
        }

        // sort_by is stable
        sessions.sort_by(|a, b| b.last_updated_at.cmp(&a.last_updated_at));
        Ok(sessions)
    }

    pub fn storage_name(&self) -> &str {
        self.storage.name()
    }
}
