//! Conversation state and the request cycle with the completion endpoint

use charla_core::utils::truncate;
use charla_core::SessionManager;
use charla_providers::{CompletionProvider, CompletionRequest, ProviderError, Role};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::message::Message;
use crate::settings::ChatSettings;

/// Shown when the underlying error carries no usable message
pub const GENERIC_FAILURE: &str =
    "Could not reach the assistant. Check your API key and network connection.";

/// Which kind of problem stopped a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Missing or placeholder endpoint credential; fix config and retry
    Configuration,
    /// Network failure, non-2xx or unreadable response; retry
    Transport,
}

/// A user-visible request failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ChatFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            message
        };
        Self { kind, message }
    }

    fn from_provider(err: &ProviderError) -> Self {
        let kind = if err.is_configuration() {
            FailureKind::Configuration
        } else {
            FailureKind::Transport
        };
        let message = match err {
            ProviderError::ApiError { message, .. } if message.trim().is_empty() => String::new(),
            other => other.to_string(),
        };
        Self::new(kind, message)
    }
}

impl std::fmt::Display for ChatFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// What a call to [`Conversation::submit`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, a request already in flight, or a closed conversation
    Ignored,
    /// The assistant reply that was appended
    Replied(Message),
    /// The request failed; the user message stays in history
    Failed(ChatFailure),
    /// The conversation was closed before the reply arrived
    Discarded,
}

/// Everything the presentation layer renders
#[derive(Debug, Clone)]
pub struct ChatView {
    pub messages: Vec<Message>,
    pub is_sending: bool,
    pub error: Option<String>,
    pub username: Option<String>,
    pub is_authenticated: bool,
}

#[derive(Debug)]
struct State {
    messages: Vec<Message>,
    next_id: u64,
    is_sending: bool,
    error: Option<ChatFailure>,
    closed: bool,
}

impl State {
    fn push(&mut self, role: Role, content: &str) -> Message {
        let message = Message::new(self.next_id, role, content);
        self.next_id += 1;
        self.messages.push(message.clone());
        message
    }
}

/// Releases the in-flight flag if a submit future is dropped mid-request
struct InFlight<'a> {
    state: &'a Mutex<State>,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.lock().is_sending = false;
        }
    }
}

/// Message history plus one request cycle at a time with the provider.
///
/// Clones share the same history.
#[derive(Clone)]
pub struct Conversation {
    provider: Arc<dyn CompletionProvider>,
    settings: Arc<ChatSettings>,
    state: Arc<Mutex<State>>,
}

impl Conversation {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: ChatSettings) -> Self {
        Self {
            provider,
            settings: Arc::new(settings),
            state: Arc::new(Mutex::new(State {
                messages: Vec::new(),
                next_id: 1,
                is_sending: false,
                error: None,
                closed: false,
            })),
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Send `text` as the next user turn and wait for the reply.
    ///
    /// The user message is appended before the provider is called. Blank
    /// text and calls made while a request is in flight are dropped.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let request = {
            let mut state = self.state.lock();
            if text.trim().is_empty() || state.is_sending || state.closed {
                debug!(
                    sending = state.is_sending,
                    closed = state.closed,
                    "Ignoring submit"
                );
                return SubmitOutcome::Ignored;
            }

            state.push(Role::User, text);
            state.error = None;
            state.is_sending = true;
            self.build_request(&state.messages)
        };

        let mut in_flight = InFlight {
            state: &self.state,
            armed: true,
        };

        info!(
            "Sending {} turns to {}: {}",
            request.messages.len(),
            self.provider.name(),
            truncate(text, 80)
        );
        let result = self.provider.complete(request).await;

        let mut state = self.state.lock();
        state.is_sending = false;
        in_flight.disarm();

        if state.closed {
            debug!("Conversation closed while request was in flight; dropping result");
            return SubmitOutcome::Discarded;
        }

        match result {
            Ok(response) => {
                let reply = state.push(Role::Assistant, response.first_text());
                debug!("Appended assistant message {}", reply.id);
                SubmitOutcome::Replied(reply)
            }
            Err(e) => {
                warn!("Completion request failed: {}", e);
                let failure = ChatFailure::from_provider(&e);
                state.error = Some(failure.clone());
                SubmitOutcome::Failed(failure)
            }
        }
    }

    fn build_request(&self, history: &[Message]) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            system: self.settings.system_prompt.clone(),
            messages: history.iter().map(Message::to_turn).collect(),
        }
    }

    /// Dismiss the visible error; history is untouched
    pub fn clear_error(&self) {
        self.state.lock().error = None;
    }

    /// Start over with an empty history. Refused while a request is in flight.
    pub fn reset(&self) -> bool {
        let mut state = self.state.lock();
        if state.is_sending {
            return false;
        }
        state.messages.clear();
        state.error = None;
        true
    }

    /// Tear down; a reply resolving afterwards no longer touches state
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    pub fn is_sending(&self) -> bool {
        self.state.lock().is_sending
    }

    pub fn error(&self) -> Option<ChatFailure> {
        self.state.lock().error.clone()
    }

    /// Snapshot for rendering, with the identity taken from `session`
    pub fn view(&self, session: &SessionManager) -> ChatView {
        let state = self.state.lock();
        ChatView {
            messages: state.messages.clone(),
            is_sending: state.is_sending,
            error: state.error.as_ref().map(|e| e.message.clone()),
            username: session.username(),
            is_authenticated: session.is_authenticated(),
        }
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("provider", &self.provider.name())
            .field("state", &*self.state.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use charla_core::auth::{MemorySessionStore, StaticAuthenticator};
    use charla_providers::{CompletionResponse, ContentBlock, ProviderResult, Turn};
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio_test::{assert_pending, assert_ready};

    /// Replays queued results, optionally waiting for a release each call
    #[derive(Default)]
    struct ScriptedProvider {
        results: Mutex<VecDeque<ProviderResult<CompletionResponse>>>,
        requests: Mutex<Vec<CompletionRequest>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedProvider {
        fn replying(texts: &[&str]) -> Self {
            Self {
                results: Mutex::new(
                    texts
                        .iter()
                        .map(|t| Ok(CompletionResponse::text(*t)))
                        .collect(),
                ),
                ..Default::default()
            }
        }

        fn gated(result: ProviderResult<CompletionResponse>) -> (Self, Arc<Notify>) {
            let gate = Arc::new(Notify::new());
            let provider = Self {
                results: Mutex::new(VecDeque::from([result])),
                gate: Some(gate.clone()),
                ..Default::default()
            };
            (provider, gate)
        }

        fn failing(err: ProviderError) -> Self {
            Self {
                results: Mutex::new(VecDeque::from([Err(err)])),
                ..Default::default()
            }
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(&self, request: CompletionRequest) -> ProviderResult<CompletionResponse> {
            self.requests.lock().push(request);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.results
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(CompletionResponse::default()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn conversation(provider: Arc<ScriptedProvider>) -> Conversation {
        Conversation::new(provider, ChatSettings::default())
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let provider = Arc::new(ScriptedProvider::replying(&["unused"]));
        let conv = conversation(provider.clone());

        for text in ["", "   ", "\n\t  \n"] {
            assert_eq!(conv.submit(text).await, SubmitOutcome::Ignored);
        }

        assert!(conv.messages().is_empty());
        assert!(provider.requests().is_empty());
        assert!(!conv.is_sending());
    }

    #[tokio::test]
    async fn test_submit_appends_user_then_assistant() {
        let (provider, gate) = ScriptedProvider::gated(Ok(CompletionResponse::text("Hi there!")));
        let provider = Arc::new(provider);
        let conv = conversation(provider.clone());

        let mut submit = tokio_test::task::spawn(conv.submit("Hello"));
        assert_pending!(submit.poll());

        let pending = conv.messages();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].role, Role::User);
        assert_eq!(pending[0].content, "Hello");
        assert!(conv.is_sending());

        gate.notify_one();
        assert!(submit.is_woken());
        let outcome = assert_ready!(submit.poll());

        let messages = conv.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Hi there!");
        assert_eq!(outcome, SubmitOutcome::Replied(messages[1].clone()));
        assert!(messages[0].id < messages[1].id);
        assert!(!conv.is_sending());
        assert!(conv.error().is_none());
    }

    #[tokio::test]
    async fn test_failure_keeps_user_message_and_sets_error() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::ApiError {
            status: 500,
            message: "overloaded".to_string(),
        }));
        let conv = conversation(provider);

        let outcome = conv.submit("Hello").await;

        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        let messages = conv.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        let error = conv.error().unwrap();
        assert_eq!(error.kind, FailureKind::Transport);
        assert!(error.message.contains("overloaded"));
        assert!(!conv.is_sending());
    }

    #[tokio::test]
    async fn test_configuration_failure_is_distinguished() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::ConfigError(
            "Anthropic API key is not configured".to_string(),
        )));
        let conv = conversation(provider);

        conv.submit("Hello").await;

        let error = conv.error().unwrap();
        assert_eq!(error.kind, FailureKind::Configuration);
        assert!(error.message.contains("API key"));
        assert_eq!(conv.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_error_message_falls_back_to_generic() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::ApiError {
            status: 503,
            message: " ".to_string(),
        }));
        let conv = conversation(provider);

        conv.submit("Hello").await;
        assert_eq!(conv.error().unwrap().message, GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn test_second_submit_while_pending_is_dropped() {
        let (provider, gate) = ScriptedProvider::gated(Ok(CompletionResponse::text("first")));
        let provider = Arc::new(provider);
        let conv = conversation(provider.clone());

        let mut first = tokio_test::task::spawn(conv.submit("one"));
        assert_pending!(first.poll());

        assert_eq!(conv.submit("two").await, SubmitOutcome::Ignored);
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(provider.requests().len(), 1);

        gate.notify_one();
        assert!(matches!(
            assert_ready!(first.poll()),
            SubmitOutcome::Replied(_)
        ));
        let contents: Vec<_> = conv.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, ["one", "first"]);
    }

    #[tokio::test]
    async fn test_payload_replays_full_history() {
        let provider = Arc::new(ScriptedProvider::replying(&["a1", "a2", "a3"]));
        let conv = conversation(provider.clone());

        conv.submit("u1").await;
        conv.submit("u2").await;
        conv.submit("u3").await;

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        for (n, request) in requests.iter().enumerate() {
            assert_eq!(request.messages.len(), 2 * n + 1);
        }
        assert_eq!(
            requests[2].messages,
            vec![
                Turn::user("u1"),
                Turn::assistant("a1"),
                Turn::user("u2"),
                Turn::assistant("a2"),
                Turn::user("u3"),
            ]
        );

        let settings = ChatSettings::default();
        assert_eq!(requests[2].model, settings.model);
        assert_eq!(requests[2].max_tokens, settings.max_tokens);
        assert_eq!(requests[2].system, settings.system_prompt);
    }

    #[tokio::test]
    async fn test_consecutive_user_turns_are_sent_as_is() {
        let provider = Arc::new(ScriptedProvider {
            results: Mutex::new(VecDeque::from([
                Err(ProviderError::InvalidResponse("bad".to_string())),
                Ok(CompletionResponse::text("ok")),
            ])),
            ..Default::default()
        });
        let conv = conversation(provider.clone());

        conv.submit("  first  ").await;
        assert!(conv.error().is_some());
        conv.submit("second").await;
        assert!(conv.error().is_none());

        assert_eq!(
            provider.requests()[1].messages,
            vec![Turn::user("  first  "), Turn::user("second")]
        );
    }

    #[tokio::test]
    async fn test_reply_without_text_block_is_empty() {
        let provider = Arc::new(ScriptedProvider {
            results: Mutex::new(VecDeque::from([Ok(CompletionResponse {
                content: vec![ContentBlock::Other],
                stop_reason: None,
            })])),
            ..Default::default()
        });
        let conv = conversation(provider);

        let outcome = conv.submit("Hello").await;

        let messages = conv.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "");
        assert!(matches!(outcome, SubmitOutcome::Replied(_)));
        assert!(conv.error().is_none());
    }

    #[tokio::test]
    async fn test_closed_conversation_discards_late_reply() {
        let (provider, gate) = ScriptedProvider::gated(Ok(CompletionResponse::text("late")));
        let conv = conversation(Arc::new(provider));

        let mut submit = tokio_test::task::spawn(conv.submit("Hello"));
        assert_pending!(submit.poll());
        assert!(!conv.is_closed());
        conv.close();
        assert!(conv.is_closed());

        gate.notify_one();
        assert_eq!(assert_ready!(submit.poll()), SubmitOutcome::Discarded);
        assert_eq!(conv.messages().len(), 1);
        assert!(!conv.is_sending());
        assert_eq!(conv.submit("again").await, SubmitOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_dropped_submit_releases_in_flight_flag() {
        let (provider, _gate) = ScriptedProvider::gated(Ok(CompletionResponse::text("never")));
        let conv = conversation(Arc::new(provider));

        let mut submit = tokio_test::task::spawn(conv.submit("Hello"));
        assert_pending!(submit.poll());
        assert!(conv.is_sending());

        drop(submit);
        assert!(!conv.is_sending());
        assert_eq!(conv.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_error_keeps_history() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::InvalidResponse(
            "garbled".to_string(),
        )));
        let conv = conversation(provider);

        conv.submit("Hello").await;
        assert!(conv.error().is_some());

        conv.clear_error();
        assert!(conv.error().is_none());
        assert_eq!(conv.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_ids_stay_unique_across_reset() {
        let provider = Arc::new(ScriptedProvider::replying(&["a", "b"]));
        let conv = conversation(provider);

        conv.submit("one").await;
        let before: Vec<u64> = conv.messages().iter().map(|m| m.id).collect();
        assert!(conv.reset());
        assert!(conv.messages().is_empty());

        conv.submit("two").await;
        let after: Vec<u64> = conv.messages().iter().map(|m| m.id).collect();
        assert_eq!(before, [1, 2]);
        assert_eq!(after, [3, 4]);
    }

    #[tokio::test]
    async fn test_reset_refused_while_sending() {
        let (provider, gate) = ScriptedProvider::gated(Ok(CompletionResponse::text("x")));
        let conv = conversation(Arc::new(provider));

        let mut submit = tokio_test::task::spawn(conv.submit("Hello"));
        assert_pending!(submit.poll());
        assert!(!conv.reset());

        gate.notify_one();
        let _ = assert_ready!(submit.poll());
        assert_eq!(conv.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_view_reads_identity_from_session() {
        let store = Arc::new(MemorySessionStore::with_record(
            r#"{"username":"user","email":"user@example.com"}"#,
        ));
        let session =
            SessionManager::new(Arc::new(StaticAuthenticator::new(Duration::ZERO)), store);
        session.restore();

        let provider = Arc::new(ScriptedProvider::replying(&["hey"]));
        let conv = conversation(provider);
        conv.submit("hi").await;

        let view = conv.view(&session);
        assert!(view.is_authenticated);
        assert_eq!(view.username.as_deref(), Some("user"));
        assert_eq!(view.messages.len(), 2);
        assert!(!view.is_sending);
        assert!(view.error.is_none());

        session.logout();
        let view = conv.view(&session);
        assert!(!view.is_authenticated);
        assert_eq!(view.messages.len(), 2);
    }
}
