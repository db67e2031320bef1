pub mod message;
pub mod session;

pub use message::{Message, Sender};
pub use session::SessionSummary;
