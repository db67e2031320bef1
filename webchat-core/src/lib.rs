pub mod config;
pub mod conversation;
pub mod delivery;
pub mod error;
pub mod models;
pub mod storage;
pub mod store;
pub mod webhook;

pub use config::WebchatConfig;
pub use conversation::Conversation;
pub use delivery::{
    create_delivery, ChatObserver, DeliveryError, DeliveryOutcome, MessageDelivery, NoopObserver,
    CONNECTION_ERROR_REPLY,
};
pub use error::WebchatError;
pub use models::{Message, Sender, SessionSummary};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use store::SessionStore;
pub use webhook::{WebhookBackend, WebhookClient, WebhookReply, WebhookRequest, FALLBACK_REPLY};
