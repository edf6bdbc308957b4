//! Agentic layer
//!
//! Turns with the mentor agent on top of the streaming infrastructure.

pub mod conversation;

pub use conversation::{ChatSession, Conversation};
