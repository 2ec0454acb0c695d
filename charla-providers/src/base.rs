//! Base trait and wire types for completion providers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProviderError {
    /// True for errors raised before any network attempt
    pub fn is_configuration(&self) -> bool {
        matches!(self, ProviderError::ConfigError(_))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conversation entry as sent to the endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A full completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system: String,
    pub messages: Vec<Turn>,
}

/// A block of response content, discriminated by its `type` field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    /// Any kind this client does not render (tool use, thinking, ...)
    #[serde(other)]
    Other,
}

/// Response from a completion provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}

impl CompletionResponse {
    /// Response holding a single text block
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            stop_reason: Some("end_turn".to_string()),
        }
    }

    /// Decode a response body leniently.
    ///
    /// A missing or non-array `content` yields no blocks, and blocks that do
    /// not decode become [`ContentBlock::Other`].
    pub fn from_value(value: &serde_json::Value) -> Self {
        let content = value
            .get("content")
            .and_then(serde_json::Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .map(|block| {
                        ContentBlock::deserialize(block).unwrap_or(ContentBlock::Other)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let stop_reason = value
            .get("stop_reason")
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string);

        Self {
            content,
            stop_reason,
        }
    }

    /// Text of the first text block, or `""` when there is none
    pub fn first_text(&self) -> &str {
        self.content
            .iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .unwrap_or("")
    }
}

/// Trait for completion providers
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send one completion request and wait for the full reply
    async fn complete(&self, request: CompletionRequest) -> ProviderResult<CompletionResponse>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}
