use bytes::BytesMut;
use std::io;
use thiserror::Error;
use tokio_util::codec::Decoder;

/// Longest line accepted by default (1 MiB)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ChatLineCodecError {
    #[error("line longer than {0} bytes")]
    MaxLineLengthExceeded(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Splits a chunked byte stream into text lines.
///
/// Bytes are buffered until a `\n` arrives, so a line (or a multi-byte
/// character) split across chunks is reassembled before decoding. A trailing
/// `\r` is dropped. Invalid UTF-8 is replaced rather than rejected. A line
/// longer than `max_length` bytes is an error.
#[derive(Debug)]
pub struct ChatLineCodec {
    /// Buffer offset already scanned for a newline
    next_index: usize,
    max_length: usize,
}

impl Default for ChatLineCodec {
    fn default() -> Self {
        Self::new_with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl ChatLineCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for ChatLineCodec {
    type Item = String;
    type Error = ChatLineCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, ChatLineCodecError> {
        // Only scan up to one byte past the limit
        let read_to = buf.len().min(self.max_length.saturating_add(1));
        let newline_offset = buf[self.next_index..read_to]
            .iter()
            .position(|b| *b == b'\n');

        match newline_offset {
            Some(offset) => {
                let newline_index = self.next_index + offset;
                self.next_index = 0;
                let line = buf.split_to(newline_index + 1);
                Ok(Some(decode_line(&line[..newline_index])))
            }
            None if buf.len() > self.max_length => {
                Err(ChatLineCodecError::MaxLineLengthExceeded(self.max_length))
            }
            None => {
                self.next_index = read_to;
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, ChatLineCodecError> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        self.next_index = 0;
        let rest = buf.split_to(buf.len());
        Ok(Some(decode_line(&rest)))
    }
}
