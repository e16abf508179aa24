//! Prompt assembly.
//!
//! Two request shapes are produced here:
//! - [`FlatPrompt`]: a single text block (persona, optional style profile,
//!   a bounded window of recent turns, the new user turn)
//! - [`conversation_request`]: a multi-turn request with a separate system
//!   instruction and the full role-tagged history

use crate::message::{ChatMessage, Role, Transcript};
use crate::model::ModelRequest;
use crate::persona::Tone;
use gemini::Content;

/// Default number of prior messages included in a flat prompt.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

const PROFILE_HEADER: &str = "--- USER STYLE PROFILE (Clone this style) ---";
const HISTORY_HEADER: &str = "--- CONVERSATION HISTORY (for immediate context) ---";
const END_CONTEXT: &str = "--- END CONTEXT ---";
const RESPOND_LINE: &str = "Respond to the user's latest input:";

/// Builder for single-turn text prompts.
#[derive(Debug, Clone)]
pub struct FlatPrompt<'a> {
    persona: &'a str,
    tone: Option<Tone>,
    profile: Option<&'a str>,
    history: &'a [ChatMessage],
}

impl<'a> FlatPrompt<'a> {
    pub fn new(persona: &'a str) -> Self {
        Self {
            persona,
            tone: None,
            profile: None,
            history: &[],
        }
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }

    pub fn with_profile(mut self, profile: &'a str) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Include the most recent `window` messages of `transcript`, counting the
    /// turn being answered when it has already been pushed.
    pub fn with_history(self, transcript: &'a Transcript, window: usize) -> Self {
        self.with_messages(transcript.window(window))
    }

    /// Include exactly `messages` as the conversation history.
    pub fn with_messages(mut self, messages: &'a [ChatMessage]) -> Self {
        self.history = messages;
        self
    }

    /// Render the prompt for `user_input`.
    pub fn render(&self, user_input: &str) -> String {
        let mut out = String::from(self.persona);
        if let Some(tone) = self.tone {
            out.push('\n');
            out.push_str(&tone.instruction());
        }
        out.push_str("\n\n");

        let has_context = self.profile.is_some() || !self.history.is_empty();
        if has_context {
            if let Some(profile) = self.profile {
                out.push_str(PROFILE_HEADER);
                out.push('\n');
                out.push_str(profile);
                out.push('\n');
            }
            out.push_str(HISTORY_HEADER);
            out.push('\n');
            for message in self.history {
                out.push_str(message.role.label());
                out.push_str(": ");
                out.push_str(&message.content);
                out.push('\n');
            }
            out.push_str(END_CONTEXT);
            out.push('\n');
            out.push_str(RESPOND_LINE);
            out.push('\n');
        }

        out.push_str("User: ");
        out.push_str(user_input);
        out.push_str("\nAssistant:");
        out
    }
}

/// Build a multi-turn request: `system` travels as the system instruction and
/// every transcript message becomes one turn.
pub fn conversation_request(system: impl Into<String>, transcript: &Transcript) -> ModelRequest {
    let contents = transcript
        .messages()
        .iter()
        .map(|m| match m.role {
            Role::User => Content::user(m.content.clone()),
            _ => Content::model(m.content.clone()),
        })
        .collect();
    ModelRequest::conversation(system, contents)
}
