//! Conversation logic for charla
//!
//! Owns the message history, assembles completion requests from it and
//! folds the provider's reply (or failure) back into renderable state.

pub mod conversation;
pub mod message;
pub mod settings;

pub use conversation::{ChatFailure, ChatView, Conversation, FailureKind, SubmitOutcome};
pub use message::Message;
pub use settings::ChatSettings;
