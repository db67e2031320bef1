//! Plain-text rendering for the chat and session views.

use std::io::Write;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use webchat_core::{ChatObserver, Message, Sender, SessionSummary};

pub const EMPTY_CHAT: &str = "No messages yet. Start the conversation!";
pub const EMPTY_SESSIONS: &str = "No chat sessions found. Start a new conversation!";

/// First 8 characters of a session id followed by `...`
pub fn short_id(id: &str) -> String {
    let prefix: String = id.chars().take(8).collect();
    format!("{}...", prefix)
}

pub fn format_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M").to_string()
}

pub fn format_date(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

/// `[HH:MM] you: text` / `[HH:MM] bot: text`
pub fn format_message(message: &Message) -> String {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Bot => "bot",
    };
    format!("[{}] {}: {}", format_time(message.timestamp), who, message.content)
}

/// Text shown for a pending placeholder.
pub fn format_placeholder(placeholder: &Message) -> String {
    if placeholder.content.is_empty() {
        "bot is typing...".to_string()
    } else {
        placeholder.content.clone()
    }
}

/// Two-line summary of a session for the management view.
pub fn format_session(summary: &SessionSummary, current: bool) -> String {
    let marker = if current { " [Current]" } else { "" };
    format!(
        "Session {}{}\n  {} messages • Last updated: {}",
        short_id(&summary.id),
        marker,
        summary.message_count,
        format_date(summary.last_updated_at)
    )
}

/// Session row in `--json` listings.
#[derive(Debug, Serialize)]
pub struct SessionRow<'a> {
    #[serde(flatten)]
    pub summary: &'a SessionSummary,
    pub current: bool,
}

pub fn session_rows<'a>(sessions: &'a [SessionSummary], active: Option<&str>) -> Vec<SessionRow<'a>> {
    sessions
        .iter()
        .map(|summary| SessionRow {
            summary,
            current: Some(summary.id.as_str()) == active,
        })
        .collect()
}

pub fn print_transcript(session_id: &str, messages: &[Message]) {
    if messages.is_empty() {
        println!("{}", EMPTY_CHAT);
        println!("Session ID: {}", short_id(session_id));
        return;
    }
    for message in messages {
        println!("{}", format_message(message));
    }
}

pub fn print_sessions(sessions: &[SessionSummary], active: Option<&str>) {
    if sessions.is_empty() {
        println!("{}", EMPTY_SESSIONS);
        return;
    }
    for summary in sessions {
        println!("{}", format_session(summary, Some(summary.id.as_str()) == active));
    }
}

/// Prints delivery progress as it happens. User messages are not echoed
/// since the user just typed them.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl ChatObserver for ConsoleObserver {
    fn message_appended(&self, message: &Message) {
        if message.sender == Sender::Bot {
            println!("{}", format_message(message));
        }
    }

    fn placeholder_shown(&self, placeholder: &Message) {
        println!("{}", format_placeholder(placeholder));
    }

    fn placeholder_updated(&self, placeholder: &Message) {
        println!("{}", format_placeholder(placeholder));
    }

    fn placeholder_cleared(&self, _placeholder: &Message) {
        let _ = std::io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(id: &str, count: usize) -> SessionSummary {
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        SessionSummary {
            id: id.to_string(),
            created_at: ts,
            last_updated_at: ts,
            message_count: count,
        }
    }

    #[test]
    fn test_short_id_takes_eight_chars() {
        assert_eq!(short_id("7b5c24ab-1234-5678-9abc-def012345678"), "7b5c24ab...");
        assert_eq!(short_id("abc"), "abc...");
    }

    #[test]
    fn test_format_message_labels_sender() {
        let user = Message::user("s", "hello");
        let bot = Message::bot("s", "hi there");

        assert!(format_message(&user).ends_with("] you: hello"));
        assert!(format_message(&bot).ends_with("] bot: hi there"));
        assert!(format_message(&user).starts_with('['));
    }

    #[test]
    fn test_format_time_is_hours_and_minutes() {
        let formatted = format_time(Utc::now());
        assert_eq!(formatted.len(), 5);
        assert_eq!(&formatted[2..3], ":");
    }

    #[test]
    fn test_placeholder_text() {
        let mut placeholder = Message::placeholder("s");
        assert_eq!(format_placeholder(&placeholder), "bot is typing...");
        placeholder.content = "Reconnecting (attempt 1/3)...".to_string();
        assert_eq!(format_placeholder(&placeholder), "Reconnecting (attempt 1/3)...");
    }

    #[test]
    fn test_format_session_marks_current() {
        let s = summary("deadbeef-cafe-babe-face-feeddeadbeef", 4);

        let current = format_session(&s, true);
        assert!(current.starts_with("Session deadbeef... [Current]"));
        assert!(current.contains("4 messages • Last updated: "));

        let other = format_session(&s, false);
        assert!(!other.contains("[Current]"));
    }

    #[test]
    fn test_session_rows_serialize_flat_with_current_flag() {
        let sessions = vec![summary("a", 1), summary("b", 2)];
        let rows = session_rows(&sessions, Some("b"));
        let json = serde_json::to_value(&rows).unwrap();

        assert_eq!(json[0]["id"], "a");
        assert_eq!(json[0]["current"], false);
        assert_eq!(json[1]["current"], true);
        assert_eq!(json[1]["message_count"], 2);
        assert!(json[1]["last_updated_at"].is_string());
    }
}
