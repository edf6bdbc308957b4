//! HTTP client for the streaming chat endpoint

use super::types::ChatRequest;
use crate::util::errors::{MentoraError, MentoraResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use log::{debug, error};
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;

pub type ChatByteStream = Pin<Box<dyn Stream<Item = MentoraResult<Bytes>> + Send>>;

/// Opens the raw byte stream for one chat turn
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open_stream(&self, request: &ChatRequest) -> MentoraResult<ChatByteStream>;
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(endpoint: impl Into<String>) -> MentoraResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MentoraError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for ChatClient {
    async fn open_stream(&self, request: &ChatRequest) -> MentoraResult<ChatByteStream> {
        request.validate()?;

        debug!(
            "Opening chat stream: endpoint={}, agent_id={}, prompt_len={}",
            self.endpoint,
            request.agent_id,
            request.prompt.len()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message_from_body(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            error!("Chat endpoint rejected request: status={}, message={}", status, message);
            return Err(MentoraError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Box::pin(response.bytes_stream().map_err(MentoraError::from)))
    }
}

/// Pull `error` out of a JSON error body, falling back to the raw text
pub(crate) fn error_message_from_body(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(json) => json
            .get("error")
            .and_then(|e| e.as_str())
            .map(str::to_string)
            .or_else(|| Some(body.to_string())),
        Err(_) => Some(body.to_string()),
    }
}
