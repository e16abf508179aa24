//! The learned style profile and the prompts that refine it.

use crate::persona::TRAINING_SCENARIO;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Profile given to sessions that have not logged in.
pub const DEFAULT_PROFILE: &str = "User currently exhibits a friendly, neutral, and curious tone.";

lazy_static! {
    static ref PROFILE_TAG: Regex = Regex::new(r"(?s)\[NEW_PROFILE:\s*(.*?)\]")
        .unwrap_or_else(|e| panic!("invalid profile tag pattern: {e}"));
}

/// A one-sentence description of how the user writes.
///
/// The text is opaque: it is only ever replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleProfile(String);

impl Default for StyleProfile {
    fn default() -> Self {
        Self(DEFAULT_PROFILE.to_string())
    }
}

impl StyleProfile {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Overwrite the profile with a model reply. Blank replies are ignored.
    ///
    /// Returns whether the profile changed.
    pub fn apply_update(&mut self, reply: &str) -> bool {
        let reply = reply.trim();
        if reply.is_empty() || reply == self.0 {
            return false;
        }
        self.0 = reply.to_string();
        true
    }

    /// Prompt asking the model to refine this profile from one new message.
    pub fn update_prompt(&self, message: &str) -> String {
        format!(
            "Analyze the following user message: \"{message}\"\n\n\
             The user's current style profile is: \"{profile}\"\n\n\
             Based on this new message, provide a **single-sentence updated profile** focusing on tone, length, punctuation, and specific slang/emojis.\n\
             Do NOT include any conversational text. Just the single, updated profile sentence.",
            profile = self.0,
        )
    }

    /// Prompt asking the model to grade a training reply and emit a tagged profile.
    pub fn training_analysis_prompt(&self, reply: &str) -> String {
        format!(
            "The user's style profile is: {profile}.\n\
             The user's reply to the scenario '{TRAINING_SCENARIO}' was: '{reply}'\n\n\
             1. Provide a funny, encouraging, and highly specific analysis of how well this reply matches the profile.\n\
             2. Then, output the single-sentence **updated profile** as a structured tag: [NEW_PROFILE: <Updated Profile Sentence>].",
            profile = self.0,
        )
    }
}

impl fmt::Display for StyleProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `[NEW_PROFILE: ...]` tag pulled out of a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedProfile {
    /// Trimmed tag contents.
    pub profile: String,
    /// The reply with the tag removed and trimmed.
    pub remainder: String,
}

/// Find the first profile tag in `response`.
pub fn extract_tagged(response: &str) -> Option<TaggedProfile> {
    let captures = PROFILE_TAG.captures(response)?;
    let whole = captures.get(0)?;
    let profile = captures.get(1)?.as_str().trim().to_string();

    let mut remainder = String::with_capacity(response.len());
    remainder.push_str(&response[..whole.start()]);
    remainder.push_str(&response[whole.end()..]);

    Some(TaggedProfile {
        profile,
        remainder: remainder.trim().to_string(),
    })
}
