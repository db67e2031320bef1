use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One chat message as stored under `messages_<session_id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    /// Set only on the placeholder shown while a send is in flight.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_loading: bool,
}

impl Message {
    pub fn new(session_id: &str, sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
            session_id: session_id.to_string(),
            is_loading: false,
        }
    }

    pub fn user(session_id: &str, content: impl Into<String>) -> Self {
        Self::new(session_id, Sender::User, content)
    }

    pub fn bot(session_id: &str, content: impl Into<String>) -> Self {
        Self::new(session_id, Sender::Bot, content)
    }

    /// An empty bot message flagged as pending.
    pub fn placeholder(session_id: &str) -> Self {
        Self {
            is_loading: true,
            ..Self::bot(session_id, "")
        }
    }
}
