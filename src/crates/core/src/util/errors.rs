//! Error types shared across the core crate

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MentoraError {
    /// Request rejected before any network call (missing prompt, busy conversation...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error reported by the server inside the stream payload
    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: status={status}, message={message}")]
    Http { status: u16, message: String },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Layout error: {0}")]
    Layout(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MentoraResult<T> = Result<T, MentoraError>;

impl MentoraError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }

    /// Errors that end a single chat turn rather than being rejected up front.
    pub fn is_turn_failure(&self) -> bool {
        !matches!(self, MentoraError::Validation(_) | MentoraError::Config(_))
    }
}

impl From<reqwest::Error> for MentoraError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return MentoraError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            };
        }
        if e.is_timeout() {
            return MentoraError::Timeout(e.to_string());
        }
        MentoraError::Transport(e.to_string())
    }
}

impl From<toml::de::Error> for MentoraError {
    fn from(e: toml::de::Error) -> Self {
        MentoraError::Config(e.to_string())
    }
}
