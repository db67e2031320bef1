use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::Message;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub message_count: usize,
}

impl SessionSummary {
    /// Summarize a stored history. An empty history is stamped with `now`.
    pub fn from_messages(id: &str, messages: &[Message], now: DateTime<Utc>) -> Self {
        let created_at = messages.first().map(|m| m.timestamp).unwrap_or(now);
        let last_updated_at = messages.last().map(|m| m.timestamp).unwrap_or(now);

        Self {
            id: id.to_string(),
            created_at,
            last_updated_at,
            message_count: messages.len(),
        }
    }
}
