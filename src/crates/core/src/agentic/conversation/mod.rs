//! Conversation with the mentor agent

pub mod chat_session;
pub mod state;

pub use chat_session::ChatSession;
pub use state::{Conversation, DEFAULT_GREETING, FALLBACK_RESPONSE};
