//! Interactive chat view.
//!
//! Reads lines from stdin. Plain lines are sent as messages; lines starting
//! with `/` are view commands. The next line is not read until the current
//! send has fully resolved, which is what keeps one send in flight.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use webchat_core::{Conversation, DeliveryError, DeliveryOutcome, MessageDelivery};

use crate::render::{self, ConsoleObserver};
use crate::sessions;

const HELP: &str = "\
Commands:
  /new            start a new chat
  /sessions       list chat sessions
  /switch <id>    open another session (id or unique prefix)
  /delete <id>    delete a session
  /history        reprint this session
  /help           show this help
  /quit           leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    New,
    Sessions,
    Switch(String),
    Delete(String),
    History,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match (name, arg) {
        ("new", _) => Command::New,
        ("sessions", _) => Command::Sessions,
        ("history", _) => Command::History,
        ("help", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        ("switch", id) if !id.is_empty() => Command::Switch(id.to_string()),
        ("delete", id) if !id.is_empty() => Command::Delete(id.to_string()),
        _ => Command::Unknown(line.to_string()),
    }
}

pub async fn run(delivery: &MessageDelivery, session_id: String) -> Result<()> {
    let store = delivery.store().clone();
    let mut conversation = Conversation::open(&store, &session_id)?;

    println!("Chat session {} (/help for commands)", render::short_id(&session_id));
    render::print_transcript(conversation.session_id(), conversation.messages());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Empty => {}
            Command::Send(text) => {
                match delivery.send(&mut conversation, &text, &ConsoleObserver).await {
                    Ok(DeliveryOutcome::Delivered { .. }) => {}
                    Ok(DeliveryOutcome::Failed { error, .. }) => {
                        tracing::debug!(error = %error, "Send failed");
                    }
                    Err(DeliveryError::Busy { .. }) => println!("Still waiting for the last reply."),
                    Err(e) => println!("{}", e),
                }
            }
            Command::New => {
                let id = sessions::create(&store)?;
                conversation = Conversation::open(&store, &id)?;
                render::print_transcript(conversation.session_id(), conversation.messages());
            }
            Command::Sessions => sessions::list(&store, false)?,
            Command::Switch(input) => match sessions::switch(&store, &input) {
                Ok(id) => {
                    conversation = Conversation::open(&store, &id)?;
                    render::print_transcript(conversation.session_id(), conversation.messages());
                }
                Err(e) => println!("{}", e),
            },
            Command::Delete(input) => match sessions::delete(&store, &input) {
                Ok(Some(id)) => {
                    conversation = Conversation::open(&store, &id)?;
                    render::print_transcript(conversation.session_id(), conversation.messages());
                }
                Ok(None) => {}
                Err(e) => println!("{}", e),
            },
            Command::History => {
                render::print_transcript(conversation.session_id(), conversation.messages())
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Unknown(line) => println!("Unknown command: {} (/help for commands)", line),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_send() {
        assert_eq!(parse_command("  olá mundo \n"), Command::Send("olá mundo".to_string()));
    }

    #[test]
    fn test_blank_line_is_empty() {
        assert_eq!(parse_command("   "), Command::Empty);
    }

    #[test]
    fn test_view_commands() {
        assert_eq!(parse_command("/new"), Command::New);
        assert_eq!(parse_command("/sessions"), Command::Sessions);
        assert_eq!(parse_command("/history"), Command::History);
        assert_eq!(parse_command("/quit"), Command::Quit);
        assert_eq!(parse_command("/exit"), Command::Quit);
        assert_eq!(parse_command("/switch 7b5c24ab"), Command::Switch("7b5c24ab".to_string()));
        assert_eq!(parse_command("/delete   abc "), Command::Delete("abc".to_string()));
    }

    #[test]
    fn test_commands_missing_argument_are_unknown() {
        assert_eq!(parse_command("/switch"), Command::Unknown("/switch".to_string()));
        assert_eq!(parse_command("/bogus"), Command::Unknown("/bogus".to_string()));
    }
}
