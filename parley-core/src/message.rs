//! Role-tagged chat messages and the per-session transcript.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who a message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    /// Out-of-band notices such as "training mode activated".
    System,
    /// An external message the user is asked to reply to during training.
    Scenario,
}

impl Role {
    /// Label used when a message is flattened into a text prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
            Role::Scenario => "Scenario",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single chat message. Immutable once appended to a [`Transcript`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
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

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn scenario(content: impl Into<String>) -> Self {
        Self::new(Role::Scenario, content)
    }
}

/// Ordered, append-only message history for one session.
///
/// Messages are never edited. The only removals are a full [`Transcript::clear`]
/// and [`Transcript::rollback_user_turn`], which undoes the user turn whose
/// model call failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// The most recent `n` messages, oldest first.
    pub fn window(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Remove the last message if it is a user turn. Returns the removed message.
    pub fn rollback_user_turn(&mut self) -> Option<ChatMessage> {
        if self.messages.last().map(|m| m.role) == Some(Role::User) {
            self.messages.pop()
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
