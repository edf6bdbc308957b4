use super::line_codec::{ChatLineCodec, ChatLineCodecError, DEFAULT_MAX_LINE_LENGTH};
use crate::infrastructure::ai::types::chat::ChatStreamPayload;
use crate::util::errors::{MentoraError, MentoraResult};
use bytes::Buf;
use futures::{Stream, StreamExt, TryStreamExt};
use log::{debug, error, trace, warn};
use serde_json::Value;
use std::io;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

const DATA_PREFIX: &str = "data:";

/// Update delivered to the subscriber while a response streams in
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChatStreamEvent<'a> {
    /// New text arrived; `content` is everything accumulated so far
    Delta { delta: &'a str, content: &'a str },
    ToolCalls(&'a [Value]),
}

/// Parse one line of the chat stream.
///
/// Returns `None` for blank lines, lines without the `data:` prefix and
/// lines whose JSON does not parse.
pub fn parse_chat_line(line: &str) -> Option<ChatStreamPayload> {
    if line.trim().is_empty() {
        return None;
    }
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        trace!("Ignoring non-data chat stream line: {:?}", line);
        return None;
    };
    let data = data.strip_prefix(' ').unwrap_or(data);

    match serde_json::from_str::<ChatStreamPayload>(data) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!("Skipping malformed chat stream line: error={}, line={}", e, line);
            None
        }
    }
}

/// Incremental decoder for the `data: {"content", "done", "error"}` stream
#[derive(Debug, Clone)]
pub struct ChatStreamDecoder {
    idle_timeout: Option<Duration>,
    max_line_length: usize,
}

impl Default for ChatStreamDecoder {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ChatStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Option<Duration>) -> Self {
        Self {
            idle_timeout,
            ..Self::default()
        }
    }

    /// Lines longer than this abort the stream with [`MentoraError::Stream`]
    pub fn max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Read `body` to completion, reporting every delta to `on_event`.
    ///
    /// Returns the accumulated text once a `done` payload arrives or the
    /// stream ends. A payload carrying `error` aborts with
    /// [`MentoraError::Stream`]; read failures abort with
    /// [`MentoraError::Transport`].
    pub async fn decode<S, B, E, F>(
        &self,
        body: S,
        cancel_token: &CancellationToken,
        mut on_event: F,
    ) -> MentoraResult<String>
    where
        S: Stream<Item = Result<B, E>>,
        B: Buf,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
        F: FnMut(ChatStreamEvent<'_>),
    {
        let reader = StreamReader::new(body.map_err(|e| io::Error::new(io::ErrorKind::Other, e)));
        let lines = FramedRead::new(reader, ChatLineCodec::new_with_max_length(self.max_line_length));
        tokio::pin!(lines);

        let mut content = String::new();
        let mut line_count = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    debug!("Chat stream cancelled: lines={}, content_len={}", line_count, content.len());
                    return Err(MentoraError::Cancelled("chat stream cancelled".to_string()));
                }
                next = next_line(&mut lines, self.idle_timeout) => next?,
            };

            let line = match next {
                Some(Ok(line)) => line,
                Some(Err(ChatLineCodecError::MaxLineLengthExceeded(limit))) => {
                    let error_msg = format!("Chat stream line longer than {} bytes", limit);
                    error!("{}", error_msg);
                    return Err(MentoraError::Stream(error_msg));
                }
                Some(Err(ChatLineCodecError::Io(e))) => {
                    let error_msg = format!("Chat stream read error: {}", e);
                    error!("{}", error_msg);
                    return Err(MentoraError::Transport(error_msg));
                }
                None => {
                    warn!(
                        "Chat stream closed without done marker: lines={}, content_len={}",
                        line_count,
                        content.len()
                    );
                    return Ok(content);
                }
            };
            line_count += 1;

            let Some(payload) = parse_chat_line(&line) else {
                continue;
            };

            if let Some(api_error) = payload.error.as_deref() {
                error!("Chat stream reported error: {}", api_error);
                return Err(MentoraError::Stream(api_error.to_string()));
            }

            if let Some(delta) = payload.delta() {
                content.push_str(delta);
                on_event(ChatStreamEvent::Delta {
                    delta,
                    content: &content,
                });
            }

            if let Some(tool_calls) = payload.tool_calls() {
                debug!("Chat stream tool calls: count={}", tool_calls.len());
                on_event(ChatStreamEvent::ToolCalls(tool_calls));
            }

            if payload.done {
                debug!(
                    "Chat stream completed: lines={}, content_len={}",
                    line_count,
                    content.len()
                );
                return Ok(content);
            }
        }
    }
}

async fn next_line<S>(lines: &mut S, idle_timeout: Option<Duration>) -> MentoraResult<Option<S::Item>>
where
    S: Stream + Unpin,
{
    match idle_timeout {
        Some(limit) => timeout(limit, lines.next()).await.map_err(|_| {
            let error_msg = format!("Chat stream idle for {}s", limit.as_secs());
            error!("{}", error_msg);
            MentoraError::Timeout(error_msg)
        }),
        None => Ok(lines.next().await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, io::Error>> {
        let items: Vec<Result<Bytes, io::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
            .collect();
        stream::iter(items)
    }

    async fn decode_all(parts: &[&str]) -> (MentoraResult<String>, Vec<String>) {
        let decoder = ChatStreamDecoder::new();
        let cancel_token = CancellationToken::new();
        let mut snapshots = Vec::new();
        let result = decoder
            .decode(chunks(parts), &cancel_token, |event| {
                if let ChatStreamEvent::Delta { content, .. } = event {
                    snapshots.push(content.to_string());
                }
            })
            .await;
        (result, snapshots)
    }

    #[test]
    fn parse_accepts_prefix_with_and_without_space() {
        assert!(parse_chat_line(r#"data:{"content":"a"}"#).is_some());
        assert!(parse_chat_line(r#"data: {"content":"a"}"#).is_some());
        assert!(parse_chat_line(r#"event: {"content":"a"}"#).is_none());
        assert!(parse_chat_line("   ").is_none());
        assert!(parse_chat_line("data: {not json").is_none());
        assert!(parse_chat_line("data: 42").is_none());
    }

    #[tokio::test]
    async fn accumulates_deltas_until_done() {
        let (result, snapshots) = decode_all(&[
            "data:{\"content\":\"He\",\"done\":false}\n\n",
            "data:{\"content\":\"llo\",\"done\":false}\n\n",
            "data:{\"content\":\"\",\"done\":true}\n\n",
        ])
        .await;

        assert_eq!(result.expect("stream completes"), "Hello");
        assert_eq!(snapshots, vec!["He".to_string(), "Hello".to_string()]);
    }

    #[tokio::test]
    async fn stops_reading_after_done() {
        let (result, _) = decode_all(&[
            "data: {\"content\":\"A\",\"done\":true}\n\n",
            "data: {\"content\":\"B\",\"done\":false}\n\n",
        ])
        .await;
        assert_eq!(result.expect("stream completes"), "A");
    }

    #[tokio::test]
    async fn skips_malformed_lines() {
        let (clean, _) = decode_all(&[
            "data: {\"content\":\"one \"}\n\n",
            "data: {\"content\":\"two\"}\n\n",
            "data: {\"done\":true}\n\n",
        ])
        .await;
        let (noisy, _) = decode_all(&[
            "data: {\"content\":\"one \"}\n\n",
            "data: {broken\n\n",
            ": keep-alive\n",
            "garbage without prefix\n",
            "data: {\"content\":\"two\"}\n\n",
            "data: [1,2]\n\n",
            "data: {\"done\":true}\n\n",
        ])
        .await;

        assert_eq!(clean.expect("clean stream"), "one two");
        assert_eq!(noisy.expect("noisy stream"), "one two");
    }

    #[tokio::test]
    async fn handles_arbitrary_chunk_boundaries() {
        let body = "data: {\"content\":\"Hel\",\"done\":false}\n\ndata: {\"content\":\"lo\",\"done\":false}\n\ndata: {\"content\":\"\",\"done\":true}\n\n";
        let bytes = body.as_bytes();
        let parts: Vec<&str> = vec![
            std::str::from_utf8(&bytes[..5]).expect("ascii"),
            std::str::from_utf8(&bytes[5..41]).expect("ascii"),
            std::str::from_utf8(&bytes[41..]).expect("ascii"),
        ];
        let (result, _) = decode_all(&parts).await;
        assert_eq!(result.expect("stream completes"), "Hello");
    }

    #[tokio::test]
    async fn error_payload_aborts_stream() {
        let (result, snapshots) = decode_all(&[
            "data: {\"content\":\"partial\"}\n\n",
            "data: {\"error\":\"Streaming error: agent unavailable\",\"done\":true}\n\n",
            "data: {\"content\":\"never\"}\n\n",
        ])
        .await;

        match result {
            Err(MentoraError::Stream(msg)) => assert_eq!(msg, "Streaming error: agent unavailable"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(snapshots, vec!["partial".to_string()]);
    }

    #[tokio::test]
    async fn returns_accumulated_content_when_stream_ends_without_done() {
        let (result, _) = decode_all(&["data: {\"content\":\"cut\"}\n\n", "data: {\"content\":\" off\"}"]).await;
        assert_eq!(result.expect("stream ends"), "cut off");
    }

    #[tokio::test]
    async fn read_failure_is_a_transport_error() {
        let items: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"data: {\"content\":\"x\"}\n\n")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
        ];
        let cancel_token = CancellationToken::new();
        let result = ChatStreamDecoder::new()
            .decode(stream::iter(items), &cancel_token, |_| {})
            .await;
        assert!(matches!(result, Err(MentoraError::Transport(_))));
    }

    #[tokio::test]
    async fn endless_line_aborts_with_stream_error() {
        let cancel_token = CancellationToken::new();
        let mut deltas = 0;
        let result = ChatStreamDecoder::new()
            .max_line_length(64)
            .decode(
                chunks(&[
                    "data: {\"content\":\"ok\"}\n\n",
                    "data: {\"content\":\"",
                    &"x".repeat(40),
                    &"x".repeat(40),
                ]),
                &cancel_token,
                |_| deltas += 1,
            )
            .await;
        assert_eq!(deltas, 1);
        match result {
            Err(MentoraError::Stream(msg)) => assert!(msg.contains("64 bytes")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn forwards_tool_calls_without_touching_content() {
        let cancel_token = CancellationToken::new();
        let mut tool_call_batches = 0;
        let result = ChatStreamDecoder::new()
            .decode(
                chunks(&[
                    "data: {\"content\":\"Sunny\"}\n\n",
                    "data: {\"toolCalls\":[{\"toolName\":\"weather\"}],\"done\":false}\n\n",
                    "data: {\"content\":\"\",\"done\":true}\n\n",
                ]),
                &cancel_token,
                |event| {
                    if let ChatStreamEvent::ToolCalls(calls) = event {
                        assert_eq!(calls[0]["toolName"], "weather");
                        tool_call_batches += 1;
                    }
                },
            )
            .await;
        assert_eq!(result.expect("stream completes"), "Sunny");
        assert_eq!(tool_call_batches, 1);
    }

    #[tokio::test]
    async fn cancellation_stops_pending_read() {
        let cancel_token = CancellationToken::new();
        cancel_token.cancel();
        let result = ChatStreamDecoder::new()
            .decode(stream::pending::<Result<Bytes, io::Error>>(), &cancel_token, |_| {})
            .await;
        assert!(matches!(result, Err(MentoraError::Cancelled(_))));
    }

    #[tokio::test]
    async fn idle_timeout_fires_on_silent_stream() {
        let cancel_token = CancellationToken::new();
        let result = ChatStreamDecoder::with_idle_timeout(Some(Duration::from_millis(20)))
            .decode(stream::pending::<Result<Bytes, io::Error>>(), &cancel_token, |_| {})
            .await;
        assert!(matches!(result, Err(MentoraError::Timeout(_))));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;
    use proptest::prelude::*;

    /// Lines the decoder must ignore
    const NOISE: &[&str] = &[
        "data: {broken",
        ": keep-alive",
        "event: message",
        "data: [1,2]",
        "data: 42",
        "garbage without prefix",
        "data:",
    ];

    fn payload_line(content: &str, done: bool) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({ "content": content, "done": done })
        )
    }

    /// Body bytes: each delta optionally preceded by a noise line, then `done`
    fn build_body(deltas: &[(String, Option<usize>)]) -> Vec<u8> {
        let mut body = String::new();
        for (delta, noise) in deltas {
            if let Some(i) = noise {
                body.push_str(NOISE[*i % NOISE.len()]);
                body.push('\n');
            }
            body.push_str(&payload_line(delta, false));
        }
        body.push_str(&payload_line("", true));
        body.into_bytes()
    }

    /// Cut `body` at the given offsets, which may fall inside a character
    fn split(body: &[u8], mut cuts: Vec<usize>) -> Vec<Result<Bytes, std::io::Error>> {
        cuts.iter_mut().for_each(|c| *c %= body.len() + 1);
        cuts.sort_unstable();
        cuts.dedup();

        let mut chunks = Vec::new();
        let mut start = 0;
        for cut in cuts.into_iter().chain(std::iter::once(body.len())) {
            if cut > start {
                chunks.push(Ok(Bytes::copy_from_slice(&body[start..cut])));
                start = cut;
            }
        }
        chunks
    }

    fn decode(chunks: Vec<Result<Bytes, std::io::Error>>) -> (MentoraResult<String>, Option<String>) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let cancel_token = CancellationToken::new();
        let mut last_seen = None;
        let result = runtime.block_on(ChatStreamDecoder::new().decode(
            stream::iter(chunks),
            &cancel_token,
            |event| {
                if let ChatStreamEvent::Delta { content, .. } = event {
                    last_seen = Some(content.to_string());
                }
            },
        ));
        (result, last_seen)
    }

    proptest! {
        #[test]
        fn result_is_concatenation_of_deltas(
            deltas in prop::collection::vec(("[a-zA-Z0-9 é漢\"\\\\]{0,8}", prop::option::of(0usize..16)), 0..10),
            cuts in prop::collection::vec(any::<usize>(), 0..12),
        ) {
            let expected: String = deltas.iter().map(|(d, _)| d.as_str()).collect();
            let body = build_body(&deltas);

            let (result, last_seen) = decode(split(&body, cuts));
            let content = result.unwrap();
            prop_assert_eq!(&content, &expected);
            if !expected.is_empty() {
                prop_assert_eq!(last_seen.as_deref(), Some(expected.as_str()));
            }
        }

        #[test]
        fn noise_lines_do_not_change_the_result(
            deltas in prop::collection::vec("[a-z ]{0,6}", 1..8),
            noise in prop::collection::vec(prop::option::of(0usize..16), 8),
            cuts in prop::collection::vec(any::<usize>(), 0..8),
        ) {
            let clean: Vec<(String, Option<usize>)> =
                deltas.iter().map(|d| (d.clone(), None)).collect();
            let noisy: Vec<(String, Option<usize>)> =
                deltas.iter().cloned().zip(noise).collect();

            let (clean_result, _) = decode(split(&build_body(&clean), Vec::new()));
            let (noisy_result, _) = decode(split(&build_body(&noisy), cuts));
            prop_assert_eq!(clean_result.unwrap(), noisy_result.unwrap());
        }
    }
}
