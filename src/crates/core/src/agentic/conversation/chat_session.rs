//! Chat session: drives conversation turns over a [`ChatTransport`]

use super::state::Conversation;
use crate::infrastructure::ai::{ChatRequest, ChatStreamDecoder, ChatStreamEvent, ChatTransport};
use crate::infrastructure::events::Observable;
use crate::util::errors::{MentoraError, MentoraResult};
use crate::util::types::ChatMessage;
use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub struct ChatSession<T: ChatTransport> {
    transport: T,
    decoder: ChatStreamDecoder,
    agent_id: String,
    conversation: Conversation,
    snapshot: Observable<Vec<ChatMessage>>,
    tool_calls: Vec<Value>,
}

/// Text stored on a failed reply
fn turn_error_text(error: &MentoraError) -> String {
    match error {
        MentoraError::Stream(message) => message.clone(),
        other => other.to_string(),
    }
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T, agent_id: impl Into<String>) -> Self {
        Self::with_conversation(transport, agent_id, Conversation::default())
    }

    pub fn with_conversation(
        transport: T,
        agent_id: impl Into<String>,
        conversation: Conversation,
    ) -> Self {
        let snapshot = Observable::new(conversation.messages().to_vec());
        Self {
            transport,
            decoder: ChatStreamDecoder::new(),
            agent_id: agent_id.into(),
            conversation,
            snapshot,
            tool_calls: Vec::new(),
        }
    }

    pub fn with_decoder(mut self, decoder: ChatStreamDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }

    /// Whole message list, republished after every change
    pub fn subscribe(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.snapshot.subscribe()
    }

    /// Tool calls reported during the latest turn
    pub fn tool_calls(&self) -> &[Value] {
        &self.tool_calls
    }

    fn publish(&self) {
        self.snapshot.set(self.conversation.messages().to_vec());
    }

    /// Run one turn and return the finished assistant reply.
    ///
    /// Missing prompt or agent id, or a turn already in flight, is rejected
    /// before anything is sent. Any later failure leaves the reply showing
    /// the fallback text with the error attached, and is returned as `Err`.
    pub async fn send(
        &mut self,
        prompt: &str,
        cancel_token: &CancellationToken,
    ) -> MentoraResult<ChatMessage> {
        let request = ChatRequest::new(prompt.trim(), self.agent_id.clone());
        request.validate()?;
        let reply_id = self.conversation.begin_turn(prompt)?;
        self.tool_calls.clear();
        self.publish();

        debug!(
            "Chat turn started: agent_id={}, reply_id={}, prompt_len={}",
            self.agent_id,
            reply_id,
            request.prompt.len()
        );

        let outcome = self.stream_reply(&request, &reply_id, cancel_token).await;
        match &outcome {
            Ok(content) => {
                self.conversation.complete_turn(&reply_id, content);
                info!(
                    "Chat turn completed: reply_id={}, content_len={}",
                    reply_id,
                    content.len()
                );
            }
            Err(e) => {
                warn!("Chat turn failed: reply_id={}, error={}", reply_id, e);
                self.conversation.fail_turn(&reply_id, &turn_error_text(e));
            }
        }
        self.conversation.finish_streaming();
        self.publish();

        outcome?;
        self.conversation
            .message(&reply_id)
            .cloned()
            .ok_or_else(|| MentoraError::NotFound(format!("reply {}", reply_id)))
    }

    async fn stream_reply(
        &mut self,
        request: &ChatRequest,
        reply_id: &str,
        cancel_token: &CancellationToken,
    ) -> MentoraResult<String> {
        let body = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                return Err(MentoraError::Cancelled("chat request cancelled".to_string()));
            }
            opened = self.transport.open_stream(request) => opened?,
        };

        let Self {
            decoder,
            conversation,
            snapshot,
            tool_calls,
            ..
        } = self;

        decoder
            .decode(body, cancel_token, |event| match event {
                ChatStreamEvent::Delta { content, .. } => {
                    conversation.apply_stream_content(reply_id, content);
                    snapshot.set(conversation.messages().to_vec());
                }
                ChatStreamEvent::ToolCalls(calls) => tool_calls.extend_from_slice(calls),
            })
            .await
    }

    /// Send the most recent user prompt again as a new turn
    pub async fn resend(&mut self, cancel_token: &CancellationToken) -> MentoraResult<ChatMessage> {
        let prompt = self
            .conversation
            .last_user_prompt()
            .map(str::to_string)
            .ok_or_else(|| MentoraError::validation("No previous message to resend"))?;
        self.send(&prompt, cancel_token).await
    }

    pub fn reset(&mut self) {
        self.conversation.reset();
        self.tool_calls.clear();
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agentic::conversation::FALLBACK_RESPONSE;
    use crate::infrastructure::ai::ChatByteStream;
    use crate::util::types::MessageRole;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedTransport {
        chunks: Vec<&'static str>,
        opened: Arc<AtomicUsize>,
        refuse: bool,
    }

    impl ScriptedTransport {
        fn new(chunks: Vec<&'static str>) -> (Self, Arc<AtomicUsize>) {
            let opened = Arc::new(AtomicUsize::new(0));
            let transport = Self {
                chunks,
                opened: opened.clone(),
                refuse: false,
            };
            (transport, opened)
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn open_stream(&self, _request: &ChatRequest) -> MentoraResult<ChatByteStream> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                return Err(MentoraError::Http {
                    status: 500,
                    message: "Internal Server Error".to_string(),
                });
            }
            let items: Vec<MentoraResult<Bytes>> = self
                .chunks
                .iter()
                .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                .collect();
            Ok(Box::pin(stream::iter(items)))
        }
    }

    const HELLO: [&str; 3] = [
        "data:{\"content\":\"He\",\"done\":false}\n\n",
        "data:{\"content\":\"llo\",\"done\":false}\n\n",
        "data:{\"content\":\"\",\"done\":true}\n\n",
    ];

    #[tokio::test]
    async fn streams_reply_into_conversation() {
        let (transport, opened) = ScriptedTransport::new(HELLO.to_vec());
        let mut session = ChatSession::new(transport, "agent-1");
        let mut updates = session.subscribe();

        let reply = session.send("hi", &CancellationToken::new()).await.unwrap();

        assert_eq!(reply.content, "Hello");
        assert!(!reply.is_streaming);
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[1].role, MessageRole::User);

        assert!(updates.has_changed().unwrap());
        let latest = updates.borrow_and_update().clone();
        assert_eq!(latest.last().map(|m| m.content.as_str()), Some("Hello"));
        assert!(!session.conversation().is_streaming());
    }

    #[tokio::test]
    async fn validation_happens_before_network() {
        let (transport, opened) = ScriptedTransport::new(HELLO.to_vec());
        let mut session = ChatSession::new(transport, "");

        let err = session.send("hi", &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Agent ID is required");

        let (transport, opened_too) = ScriptedTransport::new(HELLO.to_vec());
        let mut session = ChatSession::new(transport, "agent-1");
        assert!(session.send("   ", &CancellationToken::new()).await.is_err());

        assert_eq!(opened.load(Ordering::SeqCst), 0);
        assert_eq!(opened_too.load(Ordering::SeqCst), 0);
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn stream_error_marks_reply_and_allows_resend() {
        let (transport, opened) = ScriptedTransport::new(vec![
            "data: {\"content\":\"par\"}\n\n",
            "data: {\"error\":\"Streaming error: agent offline\",\"done\":true}\n\n",
        ]);
        let mut session = ChatSession::new(transport, "agent-1");
        let cancel = CancellationToken::new();

        let err = session.send("explain lifetimes", &cancel).await.unwrap_err();
        assert!(matches!(err, MentoraError::Stream(_)));

        let failed = session.messages().last().unwrap();
        assert_eq!(failed.content, FALLBACK_RESPONSE);
        assert_eq!(failed.error.as_deref(), Some("Streaming error: agent offline"));
        assert!(!failed.is_streaming);

        let _ = session.resend(&cancel).await;
        assert_eq!(opened.load(Ordering::SeqCst), 2);
        let prompts: Vec<&str> = session
            .messages()
            .iter()
            .filter(|m| m.is_user())
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(prompts, vec!["explain lifetimes", "explain lifetimes"]);
    }

    #[tokio::test]
    async fn transport_failure_is_a_turn_failure() {
        let (mut transport, _) = ScriptedTransport::new(Vec::new());
        transport.refuse = true;
        let mut session = ChatSession::new(transport, "agent-1");

        let err = session.send("hi", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, MentoraError::Http { status: 500, .. }));
        assert!(err.is_turn_failure());
        assert_eq!(session.messages().last().unwrap().content, FALLBACK_RESPONSE);
        assert!(!session.conversation().is_streaming());
    }

    #[tokio::test]
    async fn resend_without_history_is_rejected() {
        let (transport, _) = ScriptedTransport::new(HELLO.to_vec());
        let mut session = ChatSession::new(transport, "agent-1");
        let err = session.resend(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, MentoraError::Validation(_)));
    }

    #[tokio::test]
    async fn cancelled_turn_is_cleaned_up() {
        let (transport, _) = ScriptedTransport::new(HELLO.to_vec());
        let mut session = ChatSession::new(transport, "agent-1");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = session.send("hi", &cancel).await.unwrap_err();
        assert!(matches!(err, MentoraError::Cancelled(_)));
        assert!(!session.conversation().is_streaming());
        assert!(session.messages().iter().all(|m| !m.is_streaming));
    }

    #[tokio::test]
    async fn collects_tool_calls_and_reset_clears_history() {
        let (transport, _) = ScriptedTransport::new(vec![
            "data: {\"toolCalls\":[{\"toolName\":\"search\"}],\"done\":false}\n\n",
            "data: {\"content\":\"Found it\",\"done\":true}\n\n",
        ]);
        let mut session = ChatSession::new(transport, "agent-1");
        session.send("find docs", &CancellationToken::new()).await.unwrap();
        assert_eq!(session.tool_calls().len(), 1);

        session.reset();
        assert_eq!(session.messages().len(), 1);
        assert!(session.tool_calls().is_empty());
    }
}
