use crate::util::errors::{MentoraError, MentoraResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body posted to the streaming chat endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub prompt: String,
    pub agent_id: String,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            agent_id: agent_id.into(),
        }
    }

    pub fn validate(&self) -> MentoraResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(MentoraError::validation("Prompt is required"));
        }
        if self.agent_id.trim().is_empty() {
            return Err(MentoraError::validation("Agent ID is required"));
        }
        Ok(())
    }
}

/// JSON carried by one `data:` line of the chat stream
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamPayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<Value>>,
}

impl ChatStreamPayload {
    pub fn delta(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }

    pub fn tool_calls(&self) -> Option<&[Value]> {
        self.tool_calls.as_deref().filter(|calls| !calls.is_empty())
    }
}
