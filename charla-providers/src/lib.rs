//! Completion endpoint integrations for charla
//!
//! This crate provides the provider abstraction and the Anthropic Messages
//! API client.

pub mod anthropic;
pub mod base;

pub use anthropic::AnthropicClient;
pub use base::{
    CompletionProvider, CompletionRequest, CompletionResponse, ContentBlock, ProviderError,
    ProviderResult, Role, Turn,
};
