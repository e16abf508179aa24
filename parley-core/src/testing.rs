//! Testing utilities for chat sessions.
//!
//! This module provides tools for integration testing:
//! - `ScriptedModel` for deterministic testing without API calls
//! - `TestHarness` for scripted conversations
//! - Assertion helpers for verifying transcripts

use crate::message::{ChatMessage, Role};
use crate::model::{FragmentStream, Model, ModelError, ModelRequest};
use crate::persona::Variant;
use crate::session::{ChatSession, Progress, SessionConfig, SessionError, SessionEvent};
use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Reply returned once the script runs out.
pub const SCRIPT_EXHAUSTED: &str = "The model has no more scripted replies.";

/// One scripted model outcome.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// A successful reply. Streamed replies are split after each space.
    Reply(String),
    /// The call fails before any text is produced.
    Failure(String),
    /// The stream yields `partial` and then fails. Batch calls fail outright.
    StreamFailure { partial: String, message: String },
}

impl Scripted {
    pub fn reply(text: impl Into<String>) -> Self {
        Scripted::Reply(text.into())
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Scripted::Failure(message.into())
    }
}

fn scripted_error(message: &str) -> ModelError {
    ModelError::Api {
        status: 500,
        message: message.to_string(),
    }
}

#[derive(Debug, Default)]
struct Script {
    outcomes: VecDeque<Scripted>,
    requests: Vec<ModelRequest>,
}

/// A model that replays scripted outcomes in order and records every request.
///
/// Clones share the same script, so a test can keep a handle after giving the
/// model to a session.
#[derive(Debug, Clone, Default)]
pub struct ScriptedModel {
    script: Arc<Mutex<Script>>,
}

impl ScriptedModel {
    /// Create a model that answers with `replies` in order.
    pub fn new(replies: Vec<&str>) -> Self {
        let model = Self::default();
        for reply in replies {
            model.push(Scripted::reply(reply));
        }
        model
    }

    /// Queue an outcome.
    pub fn push(&self, outcome: Scripted) {
        self.lock().outcomes.push_back(outcome);
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn last_request(&self) -> Option<ModelRequest> {
        self.lock().requests.last().cloned()
    }

    /// Text of the single user turn of the last flat-prompt request.
    pub fn last_prompt(&self) -> Option<String> {
        self.last_request()
            .and_then(|r| r.contents.last().map(|c| c.text.clone()))
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next(&self, request: ModelRequest) -> Scripted {
        let mut script = self.lock();
        script.requests.push(request);
        script
            .outcomes
            .pop_front()
            .unwrap_or_else(|| Scripted::reply(SCRIPT_EXHAUSTED))
    }
}

#[async_trait]
impl Model for ScriptedModel {
    async fn generate(&self, request: ModelRequest) -> Result<String, ModelError> {
        match self.next(request) {
            Scripted::Reply(text) => Ok(text),
            Scripted::Failure(message) | Scripted::StreamFailure { message, .. } => {
                Err(scripted_error(&message))
            }
        }
    }

    async fn stream(&self, request: ModelRequest) -> Result<FragmentStream, ModelError> {
        match self.next(request) {
            Scripted::Reply(text) => {
                let fragments: Vec<Result<String, ModelError>> = text
                    .split_inclusive(' ')
                    .map(|piece| Ok(piece.to_string()))
                    .collect();
                Ok(stream::iter(fragments).boxed())
            }
            Scripted::Failure(message) => Err(scripted_error(&message)),
            Scripted::StreamFailure { partial, message } => {
                let items = vec![Ok(partial), Err(scripted_error(&message))];
                Ok(stream::iter(items).boxed())
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Test harness for running chat scenarios.
pub struct TestHarness {
    /// The session under test.
    pub session: ChatSession,
    /// Handle to the session's model.
    pub model: ScriptedModel,
    /// Fragments received during the last `submit`.
    pub fragments: Vec<String>,
}

impl TestHarness {
    /// Create a harness for `variant` with a fixed dice seed.
    pub fn new(variant: Variant) -> Self {
        Self::with_config(SessionConfig::new(variant).with_dice_seed(42))
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let model = ScriptedModel::default();
        let session = ChatSession::new(config, Arc::new(model.clone()));
        Self {
            session,
            model,
            fragments: Vec::new(),
        }
    }

    /// Queue a successful reply.
    pub fn expect_reply(&mut self, text: impl Into<String>) -> &mut Self {
        self.model.push(Scripted::reply(text));
        self
    }

    /// Queue a failed call.
    pub fn expect_failure(&mut self, message: impl Into<String>) -> &mut Self {
        self.model.push(Scripted::failure(message));
        self
    }

    /// Send an event, collecting streamed fragments.
    pub async fn send(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        let mut fragments = Vec::new();
        let result = self
            .session
            .handle(event, |progress| {
                if let Progress::Fragment(text) = progress {
                    fragments.push(text.to_string());
                }
            })
            .await;
        self.fragments = fragments;
        result
    }

    /// Submit chat input.
    pub async fn submit(&mut self, text: &str) -> Result<(), SessionError> {
        self.send(SessionEvent::Submit(text.to_string())).await
    }

    /// Log in as the seeded demo user.
    pub async fn login_demo_user(&mut self) -> Result<(), SessionError> {
        self.send(SessionEvent::Login {
            username: "user1".to_string(),
            password: "password".to_string(),
        })
        .await
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.session.transcript().messages()
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.session.transcript().last()
    }

    /// Roles of the transcript, oldest first.
    pub fn roles(&self) -> Vec<Role> {
        self.messages().iter().map(|m| m.role).collect()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the transcript has exactly these roles, in order.
#[track_caller]
pub fn assert_roles(harness: &TestHarness, expected: &[Role]) {
    let actual = harness.roles();
    assert_eq!(
        actual, expected,
        "Expected transcript roles {expected:?}, got {actual:?}"
    );
}

/// Assert the last message has `role` and contains `needle`.
#[track_caller]
pub fn assert_last_message(harness: &TestHarness, role: Role, needle: &str) {
    let last = harness
        .last_message()
        .unwrap_or_else(|| panic!("Expected a {role} message containing '{needle}', transcript is empty"));
    assert_eq!(last.role, role, "Expected last message role {role}, got {}", last.role);
    assert!(
        last.content.contains(needle),
        "Expected last message to contain '{needle}', got '{}'",
        last.content
    );
}

/// Assert the profile text equals `expected`.
#[track_caller]
pub fn assert_profile(harness: &TestHarness, expected: &str) {
    let actual = harness.session.profile().as_str();
    assert_eq!(actual, expected, "Expected profile '{expected}', got '{actual}'");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_model_replays_in_order() {
        let model = ScriptedModel::new(vec!["one", "two"]);
        assert_eq!(model.generate(ModelRequest::prompt("a")).await.unwrap(), "one");
        assert_eq!(model.generate(ModelRequest::prompt("b")).await.unwrap(), "two");
        assert_eq!(
            model.generate(ModelRequest::prompt("c")).await.unwrap(),
            SCRIPT_EXHAUSTED
        );
        assert_eq!(model.request_count(), 3);
        assert_eq!(model.last_prompt().as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_scripted_stream_splits_words() {
        let model = ScriptedModel::new(vec!["The door creaks open."]);
        let fragments: Vec<String> = model
            .stream(ModelRequest::prompt("x"))
            .await
            .unwrap()
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["The ", "door ", "creaks ", "open."]);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let model = ScriptedModel::default();
        model.push(Scripted::failure("boom"));
        let err = model.generate(ModelRequest::prompt("x")).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_harness_collects_fragments() {
        let mut harness = TestHarness::new(Variant::Solo);
        harness.expect_reply("Welcome, traveler.");
        harness.submit("hello").await.unwrap();

        assert_eq!(harness.fragments, vec!["Welcome, ", "traveler."]);
        assert_roles(&harness, &[Role::User, Role::Assistant]);
        assert_last_message(&harness, Role::Assistant, "Welcome, traveler.");
    }
}
