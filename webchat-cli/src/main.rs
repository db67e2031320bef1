//! webchat: terminal chat client for a webhook-backed assistant
//!
//! Messages go to the configured webhook; every session's history is kept
//! in a local JSON store so past chats can be listed, reopened and deleted.
//!
//! # Subcommands
//! - `chat [--session <id>]`                 interactive chat view
//! - `send <text> [--session <id>]`          deliver one message and print the reply
//! - `sessions [list|new|switch|delete]`     session-management view
//! - `history [--session <id>] [--json]`     print a transcript

mod chat;
mod render;
mod sessions;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use webchat_core::{create_delivery, Conversation, DeliveryOutcome, MessageDelivery, WebchatConfig};

use render::ConsoleObserver;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "webchat",
    version,
    about = "Chat with a webhook-backed assistant, keeping local session history"
)]
struct Cli {
    /// Config file (TOML, optional). WEBCHAT__* env vars override it.
    #[arg(short, long, env = "WEBCHAT_CONFIG", default_value = "webchat.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Open the interactive chat view
    Chat {
        /// Session to open (id or unique prefix); becomes the active session
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Send one message and print the reply
    Send {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Session to send in (defaults to the active session)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Manage chat sessions (lists them when no action is given)
    Sessions {
        #[command(subcommand)]
        action: Option<SessionAction>,
    },

    /// Print a session's transcript
    History {
        /// Session to print (defaults to the active session)
        #[arg(short, long)]
        session: Option<String>,

        /// Output messages as stored JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum SessionAction {
    /// List sessions, most recently updated first
    List {
        #[arg(long)]
        json: bool,
    },

    /// Start a new chat and make it active
    New,

    /// Make another session active
    Switch { id: String },

    /// Delete a session; deleting the active one starts a new chat
    Delete { id: String },
}

// ============================================================================
// Commands
// ============================================================================

/// Session id to act on: the given one (resolved against stored sessions)
/// or the active session, created if needed.
fn pick_session(delivery: &MessageDelivery, session: Option<&str>) -> Result<String> {
    match session {
        Some(input) => sessions::resolve_session(delivery.store(), input),
        None => Ok(delivery.store().open_or_create()?),
    }
}

async fn do_chat(delivery: &MessageDelivery, session: Option<String>) -> Result<()> {
    let session_id = pick_session(delivery, session.as_deref())?;
    delivery.store().set_active(&session_id)?;
    chat::run(delivery, session_id).await
}

async fn do_send(delivery: &MessageDelivery, text: &str, session: Option<String>) -> Result<()> {
    let session_id = pick_session(delivery, session.as_deref())?;
    let mut conversation = Conversation::open(delivery.store(), &session_id)?;

    match delivery.send(&mut conversation, text, &ConsoleObserver).await? {
        DeliveryOutcome::Delivered { .. } => Ok(()),
        DeliveryOutcome::Failed { error, .. } => {
            eprintln!("webchat: {}", error);
            std::process::exit(1);
        }
    }
}

fn do_sessions(delivery: &MessageDelivery, action: Option<SessionAction>) -> Result<()> {
    let store = delivery.store();
    match action.unwrap_or(SessionAction::List { json: false }) {
        SessionAction::List { json } => sessions::list(store, json),
        SessionAction::New => sessions::create(store).map(|_| ()),
        SessionAction::Switch { id } => sessions::switch(store, &id).map(|_| ()),
        SessionAction::Delete { id } => sessions::delete(store, &id).map(|_| ()),
    }
}

fn do_history(delivery: &MessageDelivery, session: Option<String>, json: bool) -> Result<()> {
    let session_id = match session {
        Some(input) => sessions::resolve_session(delivery.store(), &input)?,
        None => match delivery.store().active_session()? {
            Some(id) => id,
            None => {
                println!("{}", render::EMPTY_CHAT);
                return Ok(());
            }
        },
    };
    let messages = delivery.store().load(&session_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else {
        render::print_transcript(&session_id, &messages);
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match WebchatConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };

    // Init logging on stderr so chat output stays clean
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let delivery = match create_delivery(&config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("webchat: {}", e);
            std::process::exit(1);
        }
    };

    tracing::debug!(storage = delivery.store().storage_name(), "webchat starting");

    let result = match cli.command {
        Commands::Chat { session } => do_chat(&delivery, session).await,
        Commands::Send { text, session } => do_send(&delivery, &text.join(" "), session).await,
        Commands::Sessions { action } => do_sessions(&delivery, action),
        Commands::History { session, json } => do_history(&delivery, session, json),
    };

    if let Err(e) = result {
        eprintln!("webchat: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
