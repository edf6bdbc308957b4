//! Chat stream decoding
//!
//! Turns the chunked `data: {...}` response of the chat endpoint into
//! accumulated message text.

pub mod chat;
pub mod line_codec;

pub use chat::{parse_chat_line, ChatStreamDecoder, ChatStreamEvent};
pub use line_codec::{ChatLineCodec, ChatLineCodecError, DEFAULT_MAX_LINE_LENGTH};
