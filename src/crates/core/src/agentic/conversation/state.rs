//! Message list of one conversation with the mentor agent

use crate::util::errors::{MentoraError, MentoraResult};
use crate::util::types::ChatMessage;
use serde::Serialize;

pub const DEFAULT_GREETING: &str = "Hello! I'm your AI assistant powered by Letta. I can help you with questions, provide guidance, and have meaningful conversations. What would you like to know?";

/// Shown in place of an assistant reply whose turn failed
pub const FALLBACK_RESPONSE: &str = "I encountered an issue processing your request. This might be due to conflicting information or a temporary error. Please try again or rephrase your message.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    greeting: Option<String>,
    messages: Vec<ChatMessage>,
    /// Assistant placeholder of the turn in flight
    streaming_id: Option<String>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::with_greeting(DEFAULT_GREETING)
    }
}

impl Conversation {
    /// Empty conversation without a greeting
    pub fn new() -> Self {
        Self {
            greeting: None,
            messages: Vec::new(),
            streaming_id: None,
        }
    }

    pub fn with_greeting(text: impl Into<String>) -> Self {
        let greeting = text.into();
        Self {
            messages: vec![ChatMessage::assistant(greeting.clone())],
            greeting: Some(greeting),
            streaming_id: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn message(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming_id.is_some()
    }

    pub fn streaming_id(&self) -> Option<&str> {
        self.streaming_id.as_deref()
    }

    /// Append the user prompt and an empty streaming reply; returns the reply id
    pub fn begin_turn(&mut self, prompt: &str) -> MentoraResult<String> {
        if prompt.trim().is_empty() {
            return Err(MentoraError::validation("Prompt is required"));
        }
        if self.is_streaming() {
            return Err(MentoraError::validation(
                "A response is still streaming; wait for it to finish",
            ));
        }

        let placeholder = ChatMessage::assistant_placeholder();
        let id = placeholder.id.clone();
        self.messages.push(ChatMessage::user(prompt.trim()));
        self.messages.push(placeholder);
        self.streaming_id = Some(id.clone());
        Ok(id)
    }

    fn message_mut(&mut self, id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Replace the reply text with everything received so far
    pub fn apply_stream_content(&mut self, id: &str, content: &str) -> bool {
        match self.message_mut(id) {
            Some(message) => {
                message.content.clear();
                message.content.push_str(content);
                true
            }
            None => false,
        }
    }

    pub fn complete_turn(&mut self, id: &str, content: &str) -> bool {
        match self.message_mut(id) {
            Some(message) => {
                message.content = content.to_string();
                message.is_streaming = false;
                message.error = None;
                true
            }
            None => false,
        }
    }

    pub fn fail_turn(&mut self, id: &str, error: &str) -> bool {
        match self.message_mut(id) {
            Some(message) => {
                message.content = FALLBACK_RESPONSE.to_string();
                message.is_streaming = false;
                message.error = Some(error.to_string());
                true
            }
            None => false,
        }
    }

    /// Clear every in-progress marker; runs after each turn whatever its outcome
    pub fn finish_streaming(&mut self) {
        self.streaming_id = None;
        for message in &mut self.messages {
            message.is_streaming = false;
        }
    }

    pub fn last_user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_user())
            .map(|m| m.content.as_str())
    }

    /// Back to the greeting alone
    pub fn reset(&mut self) {
        self.messages = self
            .greeting
            .iter()
            .map(|g| ChatMessage::assistant(g.clone()))
            .collect();
        self.streaming_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::types::MessageRole;

    #[test]
    fn starts_with_greeting() {
        let conversation = Conversation::default();
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].role, MessageRole::Assistant);
        assert_eq!(conversation.messages()[0].content, DEFAULT_GREETING);
        assert!(Conversation::new().messages().is_empty());
    }

    #[test]
    fn turn_lifecycle() {
        let mut conversation = Conversation::default();
        let id = conversation.begin_turn("hi").unwrap();

        let reply = conversation.message(&id).unwrap();
        assert!(reply.is_streaming);
        assert!(reply.content.is_empty());
        assert_eq!(conversation.messages().len(), 3);

        conversation.apply_stream_content(&id, "He");
        conversation.apply_stream_content(&id, "Hello");
        assert_eq!(conversation.message(&id).unwrap().content, "Hello");

        conversation.complete_turn(&id, "Hello");
        conversation.finish_streaming();
        let reply = conversation.message(&id).unwrap();
        assert!(!reply.is_streaming);
        assert!(!conversation.is_streaming());
    }

    #[test]
    fn rejects_blank_prompt_and_concurrent_turn() {
        let mut conversation = Conversation::default();
        assert!(matches!(conversation.begin_turn("  "), Err(MentoraError::Validation(_))));

        conversation.begin_turn("first").unwrap();
        assert!(matches!(conversation.begin_turn("second"), Err(MentoraError::Validation(_))));
        assert_eq!(conversation.messages().len(), 3);
    }

    #[test]
    fn failure_shows_fallback_and_keeps_error() {
        let mut conversation = Conversation::default();
        let id = conversation.begin_turn("hi").unwrap();
        conversation.apply_stream_content(&id, "partial");
        conversation.fail_turn(&id, "agent unavailable");
        conversation.finish_streaming();

        let reply = conversation.message(&id).unwrap();
        assert_eq!(reply.content, FALLBACK_RESPONSE);
        assert_eq!(reply.error.as_deref(), Some("agent unavailable"));
        assert_eq!(conversation.last_user_prompt(), Some("hi"));
    }

    #[test]
    fn reset_returns_to_greeting() {
        let mut conversation = Conversation::with_greeting("Welcome");
        conversation.begin_turn("hi").unwrap();
        conversation.reset();
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].content, "Welcome");
        assert!(!conversation.is_streaming());
        assert!(conversation.last_user_prompt().is_none());
    }
}
