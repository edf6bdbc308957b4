//! AI infrastructure
//!
//! Client for the mentor agent's streaming chat endpoint and the decoder for
//! its response format.

pub mod client;
pub mod stream_handler;
pub mod types;

pub use client::{ChatByteStream, ChatClient, ChatTransport};
pub use stream_handler::{ChatStreamDecoder, ChatStreamEvent};
pub use types::{ChatRequest, ChatStreamPayload};
