//! ChatSession - the per-session context object behind every variant.
//!
//! A session owns the transcript, the style profile, the variant flags, the
//! last dice roll, the character sheet and a handle to the model. Every state
//! change goes through [`ChatSession::handle`]; front-ends render the
//! [`SessionView`] snapshots it produces and never touch session state directly.

use crate::accounts::AccountDirectory;
use crate::dice::{DiceError, DiceRequest, RollResult};
use crate::message::{ChatMessage, Role, Transcript};
use crate::model::{GenerationSettings, Model, ModelError, ModelRequest};
use crate::persona::{
    Tone, Variant, ECHO_PERSONA, SOLO_DM_INSTRUCTIONS, TRAINING_ACTIVATED,
    TRAINING_ANALYSIS_HEADER, TRAINING_SCENARIO,
};
use crate::profile::{extract_tagged, StyleProfile};
use crate::prompt::{conversation_request, FlatPrompt, DEFAULT_HISTORY_WINDOW};
use crate::sheet::{CharacterSheet, SheetField};
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Shown in the sidebar before the first roll.
pub const NO_ROLL_LABEL: &str = "—";
pub const NO_ROLL_DETAILS: &str = "Click a dice button to roll.";

/// Errors from session events. All of them are shown inline; none end the session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid roll: {0}")]
    Dice(#[from] DiceError),

    #[error("Please sign in to load your personal style profile.")]
    NotLoggedIn,

    #[error("Invalid username or password.")]
    LoginFailed,

    #[error("Already signed in as {0}.")]
    AlreadyLoggedIn(String),

    #[error("No training session is active.")]
    NotTraining,

    #[error("Begin the adventure first.")]
    IntroPending,

    #[error("Please wait for the DM's response before rolling again.")]
    RollPending,

    #[error("Only a single die can be rolled into the chat (got {0}).")]
    MultiDieRoll(DiceRequest),

    #[error("'{action}' is not available in the {variant} variant.")]
    Unsupported {
        variant: Variant,
        action: &'static str,
    },
}

impl SessionError {
    /// Text shown in the chat for this error.
    pub fn user_message(&self, variant: Variant) -> String {
        match self {
            SessionError::Model(e) => match variant {
                Variant::Party | Variant::Solo => {
                    format!("A critical quest failure (API error) occurred: {e}")
                }
                Variant::Clone | Variant::Echo => format!("Could not get a reply (API error): {e}"),
            },
            other => other.to_string(),
        }
    }

    /// Whether the failure came from the model call.
    pub fn is_model_failure(&self) -> bool {
        matches!(self, SessionError::Model(_))
    }
}

/// Configuration for creating a new chat session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub variant: Variant,

    /// Prior messages included in flat prompts.
    pub history_window: usize,

    /// Model name, temperature and token limit applied to every request.
    pub generation: GenerationSettings,

    /// Fixed seed for dice, for reproducible runs.
    pub dice_seed: Option<u64>,
}

impl SessionConfig {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            history_window: DEFAULT_HISTORY_WINDOW,
            generation: GenerationSettings::default(),
            dice_seed: None,
        }
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.generation.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.generation.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: usize) -> Self {
        self.generation.max_output_tokens = Some(tokens);
        self
    }

    pub fn with_dice_seed(mut self, seed: u64) -> Self {
        self.dice_seed = Some(seed);
        self
    }
}

/// A user action.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Chat input. Blank input is ignored.
    Submit(String),
    Roll(DiceRequest),
    StartTraining,
    EndTraining,
    Login { username: String, password: String },
    Logout,
    BeginAdventure,
    ToggleRules,
    SetTone(Tone),
    UpdateSheet(SheetField, String),
    Reset,
}

impl SessionEvent {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Submit(_) => "submit",
            SessionEvent::Roll(_) => "roll",
            SessionEvent::StartTraining => "start_training",
            SessionEvent::EndTraining => "end_training",
            SessionEvent::Login { .. } => "login",
            SessionEvent::Logout => "logout",
            SessionEvent::BeginAdventure => "begin_adventure",
            SessionEvent::ToggleRules => "toggle_rules",
            SessionEvent::SetTone(_) => "set_tone",
            SessionEvent::UpdateSheet(..) => "update_sheet",
            SessionEvent::Reset => "reset",
        }
    }
}

/// Intermediate output while an event is being handled.
#[derive(Debug)]
pub enum Progress<'a> {
    /// State changed ahead of a model call (the user turn is now visible).
    Snapshot(SessionView),
    /// One streamed piece of the reply being generated.
    Fragment(&'a str),
}

/// Immutable snapshot of a session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub session_id: Uuid,
    pub variant: Variant,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub profile: String,
    pub username: Option<String>,
    pub training_active: bool,
    pub tone: Tone,
    pub show_intro: bool,
    pub rules_visible: bool,
    pub game_started: bool,
    pub last_roll: Option<RollResult>,
    pub sheet: CharacterSheet,
    /// One-off status message from the last event ("Logged out successfully.").
    pub notice: Option<String>,
}

impl SessionView {
    pub fn logged_in(&self) -> bool {
        self.username.is_some()
    }

    /// Headline for the last roll, e.g. `d20 Roll: 17`.
    pub fn last_roll_label(&self) -> String {
        self.last_roll
            .as_ref()
            .map_or_else(|| NO_ROLL_LABEL.to_string(), RollResult::label)
    }

    pub fn roll_details(&self) -> String {
        self.last_roll
            .as_ref()
            .map_or_else(|| NO_ROLL_DETAILS.to_string(), RollResult::trace)
    }

    /// Whether chat input is accepted right now.
    pub fn accepts_input(&self) -> bool {
        match self.variant {
            Variant::Echo => self.logged_in(),
            Variant::Party => !self.show_intro,
            Variant::Clone | Variant::Solo => true,
        }
    }
}

/// A chat session for one variant.
pub struct ChatSession {
    id: Uuid,
    config: SessionConfig,
    model: Arc<dyn Model>,
    transcript: Transcript,
    profile: StyleProfile,
    accounts: AccountDirectory,
    username: Option<String>,
    training_active: bool,
    tone: Option<Tone>,
    show_intro: bool,
    rules_visible: bool,
    game_started: bool,
    last_roll: Option<RollResult>,
    sheet: CharacterSheet,
    notice: Option<String>,
    rng: StdRng,
}

impl ChatSession {
    /// Create a session with the seeded demo account directory.
    pub fn new(config: SessionConfig, model: Arc<dyn Model>) -> Self {
        let rng = match config.dice_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let id = Uuid::new_v4();
        info!(session_id = %id, variant = %config.variant, model = model.name(), "session created");

        Self {
            id,
            config,
            model,
            transcript: Transcript::new(),
            profile: StyleProfile::default(),
            accounts: AccountDirectory::default(),
            username: None,
            training_active: false,
            tone: None,
            show_intro: true,
            rules_visible: false,
            game_started: false,
            last_roll: None,
            sheet: CharacterSheet::default(),
            notice: None,
            rng,
        }
    }

    /// Replace the account directory.
    pub fn with_accounts(mut self, accounts: AccountDirectory) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn variant(&self) -> Variant {
        self.config.variant
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn profile(&self) -> &StyleProfile {
        &self.profile
    }

    pub fn accounts(&self) -> &AccountDirectory {
        &self.accounts
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn training_active(&self) -> bool {
        self.training_active
    }

    pub fn last_roll(&self) -> Option<&RollResult> {
        self.last_roll.as_ref()
    }

    pub fn sheet(&self) -> &CharacterSheet {
        &self.sheet
    }

    fn model_name(&self) -> &str {
        self.config
            .generation
            .model
            .as_deref()
            .unwrap_or_else(|| self.model.name())
    }

    /// Snapshot of the current state.
    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id,
            variant: self.config.variant,
            model: self.model_name().to_string(),
            messages: self.transcript.messages().to_vec(),
            profile: self.profile.as_str().to_string(),
            username: self.username.clone(),
            training_active: self.training_active,
            tone: self.tone.unwrap_or_default(),
            show_intro: self.show_intro,
            rules_visible: self.rules_visible,
            game_started: self.game_started,
            last_roll: self.last_roll.clone(),
            sheet: self.sheet.clone(),
            notice: self.notice.clone(),
        }
    }

    // ========================================================================
    // Event handling
    // ========================================================================

    /// Apply one user action.
    ///
    /// `progress` receives a snapshot before each model call and every streamed
    /// fragment. On a failed model call the user turn is rolled back and the
    /// error returned; the session stays usable.
    #[instrument(
        skip_all,
        fields(session_id = %self.id, variant = %self.config.variant, event = event.name())
    )]
    pub async fn handle<F>(&mut self, event: SessionEvent, mut progress: F) -> Result<(), SessionError>
    where
        F: FnMut(Progress<'_>) + Send,
    {
        self.notice = None;
        let progress: &mut (dyn FnMut(Progress<'_>) + Send) = &mut progress;

        match event {
            SessionEvent::Submit(text) => self.submit(text, progress).await,
            SessionEvent::Roll(request) => self.roll(request, progress).await,
            SessionEvent::StartTraining => self.start_training(),
            SessionEvent::EndTraining => self.end_training(),
            SessionEvent::Login { username, password } => self.login(&username, &password),
            SessionEvent::Logout => self.logout(),
            SessionEvent::BeginAdventure => {
                self.require(&[Variant::Party], "begin adventure")?;
                self.show_intro = false;
                Ok(())
            }
            SessionEvent::ToggleRules => {
                self.require(&[Variant::Party, Variant::Solo], "rules")?;
                self.rules_visible = !self.rules_visible;
                Ok(())
            }
            SessionEvent::SetTone(tone) => {
                self.require(&[Variant::Clone, Variant::Echo], "tone")?;
                self.tone = Some(tone);
                self.notice = Some(format!("Tone set to {tone}."));
                Ok(())
            }
            SessionEvent::UpdateSheet(field, value) => {
                self.require(&[Variant::Solo], "character sheet")?;
                self.sheet.set(field, value.trim());
                Ok(())
            }
            SessionEvent::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    /// Apply an action with no progress reporting.
    pub async fn handle_quiet(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        self.handle(event, |_| {}).await
    }

    fn require(&self, allowed: &[Variant], action: &'static str) -> Result<(), SessionError> {
        if allowed.contains(&self.config.variant) {
            Ok(())
        } else {
            Err(SessionError::Unsupported {
                variant: self.config.variant,
                action,
            })
        }
    }

    fn require_login(&self) -> Result<(), SessionError> {
        if self.username.is_some() {
            Ok(())
        } else {
            Err(SessionError::NotLoggedIn)
        }
    }

    async fn submit(
        &mut self,
        text: String,
        progress: &mut (dyn FnMut(Progress<'_>) + Send),
    ) -> Result<(), SessionError> {
        if text.trim().is_empty() {
            return Ok(());
        }

        match self.config.variant {
            Variant::Clone => self.submit_clone(text, progress).await,
            Variant::Echo if self.training_active => self.finish_training(text, progress).await,
            Variant::Echo => self.submit_echo(text, progress).await,
            Variant::Party => self.submit_party(text, progress).await,
            Variant::Solo => self.submit_solo(text, progress).await,
        }
    }

    async fn submit_clone(
        &mut self,
        text: String,
        progress: &mut (dyn FnMut(Progress<'_>) + Send),
    ) -> Result<(), SessionError> {
        let mut prompt = FlatPrompt::new(Variant::Clone.persona());
        if let Some(tone) = self.tone {
            prompt = prompt.with_tone(tone);
        }
        let prompt = prompt.render(&text);

        self.push_user_turn(text, progress);
        let reply = self.generate(ModelRequest::prompt(prompt)).await;
        self.finish_turn(reply)
    }

    async fn submit_echo(
        &mut self,
        text: String,
        progress: &mut (dyn FnMut(Progress<'_>) + Send),
    ) -> Result<(), SessionError> {
        self.require_login()?;
        self.push_user_turn(text.clone(), progress);

        // The refreshed profile is only kept once the turn itself succeeds.
        let mut refreshed = self.profile.clone();
        let update = ModelRequest::prompt(self.profile.update_prompt(&text));
        let changed = match self.generate(update).await {
            Ok(reply) => refreshed.apply_update(&reply),
            Err(e) => {
                warn!(error = %e, "style profile refresh failed, keeping current profile");
                false
            }
        };

        let mut prompt = FlatPrompt::new(ECHO_PERSONA)
            .with_profile(refreshed.as_str())
            .with_history(&self.transcript, self.config.history_window);
        if let Some(tone) = self.tone {
            prompt = prompt.with_tone(tone);
        }
        let prompt = prompt.render(&text);

        let reply = self.generate(ModelRequest::prompt(prompt)).await;
        self.finish_turn(reply)?;
        if changed {
            self.profile = refreshed;
            self.persist_profile();
            debug!(profile = self.profile.as_str(), "style profile refreshed");
        }
        Ok(())
    }

    async fn submit_party(
        &mut self,
        text: String,
        progress: &mut (dyn FnMut(Progress<'_>) + Send),
    ) -> Result<(), SessionError> {
        if self.show_intro {
            return Err(SessionError::IntroPending);
        }
        self.push_user_turn(text, progress);
        self.reply_as_party_dm().await
    }

    async fn reply_as_party_dm(&mut self) -> Result<(), SessionError> {
        let request = conversation_request(Variant::Party.persona(), &self.transcript);
        let reply = self.generate(request).await;
        self.finish_turn(reply)?;
        self.game_started = true;
        Ok(())
    }

    async fn submit_solo(
        &mut self,
        text: String,
        progress: &mut (dyn FnMut(Progress<'_>) + Send),
    ) -> Result<(), SessionError> {
        self.push_user_turn(text, progress);

        let system = format!("{SOLO_DM_INSTRUCTIONS}\n\n{}", self.sheet.system_block());
        let request = conversation_request(system, &self.transcript)
            .with_settings(&self.config.generation);
        debug!(
            model = self.model_name(),
            prompt_chars = request.prompt_chars(),
            "streaming reply"
        );

        let mut fragments = match self.model.stream(request).await {
            Ok(fragments) => fragments,
            Err(e) => return self.finish_turn(Err(e)),
        };

        let mut reply = String::new();
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => {
                    reply.push_str(&text);
                    progress(Progress::Fragment(&text));
                }
                Err(e) => {
                    warn!(received = reply.len(), "stream failed mid-reply, discarding partial text");
                    return self.finish_turn(Err(e));
                }
            }
        }

        debug!(reply_chars = reply.len(), "stream complete");
        self.finish_turn(Ok(reply))
    }

    async fn roll(
        &mut self,
        request: DiceRequest,
        progress: &mut (dyn FnMut(Progress<'_>) + Send),
    ) -> Result<(), SessionError> {
        self.require(&[Variant::Party, Variant::Solo], "dice")?;

        if self.config.variant == Variant::Solo {
            let result = request.roll_with_rng(&mut self.rng)?;
            info!(roll = %result, "dice rolled");
            self.last_roll = Some(result);
            return Ok(());
        }

        if request.num_dice != 1 || request.drop_lowest != 0 {
            return Err(SessionError::MultiDieRoll(request));
        }
        if self.show_intro {
            return Err(SessionError::IntroPending);
        }
        if self.transcript.last().map(|m| m.role) == Some(Role::User) {
            return Err(SessionError::RollPending);
        }

        let result = request.roll_with_rng(&mut self.rng)?;
        info!(roll = %result, "dice rolled into chat");
        let announcement = result.announcement();
        let previous = self.last_roll.replace(result);
        self.push_user_turn(announcement, progress);
        let reply = self.reply_as_party_dm().await;
        if reply.is_err() {
            self.last_roll = previous;
        }
        reply
    }

    // ========================================================================
    // Echo: accounts and training
    // ========================================================================

    fn login(&mut self, username: &str, password: &str) -> Result<(), SessionError> {
        self.require(&[Variant::Echo], "login")?;
        if let Some(current) = &self.username {
            return Err(SessionError::AlreadyLoggedIn(current.clone()));
        }

        let username = username.trim();
        let profile = self
            .accounts
            .authenticate(username, password)
            .cloned()
            .ok_or(SessionError::LoginFailed)?;

        info!(username, "logged in");
        self.profile = profile;
        self.username = Some(username.to_string());
        self.notice = Some(format!(
            "Welcome back, {username}! Your style profile has been loaded."
        ));
        Ok(())
    }

    fn logout(&mut self) -> Result<(), SessionError> {
        self.require(&[Variant::Echo], "logout")?;
        let username = self.username.take().ok_or(SessionError::NotLoggedIn)?;

        info!(%username, "logged out");
        self.transcript.clear();
        self.profile = StyleProfile::default();
        self.training_active = false;
        self.notice = Some("Logged out successfully.".to_string());
        Ok(())
    }

    fn start_training(&mut self) -> Result<(), SessionError> {
        self.require(&[Variant::Echo], "training")?;
        self.require_login()?;
        if self.training_active {
            return Ok(());
        }

        self.transcript.push(ChatMessage::system(TRAINING_ACTIVATED));
        self.transcript.push(ChatMessage::scenario(TRAINING_SCENARIO));
        self.training_active = true;
        Ok(())
    }

    fn end_training(&mut self) -> Result<(), SessionError> {
        self.require(&[Variant::Echo], "training")?;
        if !self.training_active {
            return Err(SessionError::NotTraining);
        }
        self.training_active = false;
        self.notice = Some("Training session ended.".to_string());
        Ok(())
    }

    async fn finish_training(
        &mut self,
        reply: String,
        progress: &mut (dyn FnMut(Progress<'_>) + Send),
    ) -> Result<(), SessionError> {
        self.require_login()?;
        self.training_active = false;
        let prompt = self.profile.training_analysis_prompt(&reply);
        self.push_user_turn(format!("(My Reply): {reply}"), progress);

        let analysis = match self.generate(ModelRequest::prompt(prompt)).await {
            Ok(analysis) => analysis,
            Err(e) => {
                // Let the user answer the scenario again.
                self.training_active = true;
                return self.finish_turn(Err(e));
            }
        };

        let shown = match extract_tagged(&analysis) {
            Some(tagged) => {
                if self.profile.apply_update(&tagged.profile) {
                    self.persist_profile();
                    info!(profile = self.profile.as_str(), "profile updated from training");
                }
                tagged.remainder
            }
            None => {
                debug!("training analysis carried no profile tag");
                analysis.trim().to_string()
            }
        };

        self.finish_turn(Ok(format!("{TRAINING_ANALYSIS_HEADER}\n{shown}")))
    }

    fn persist_profile(&mut self) {
        if let Some(username) = &self.username {
            self.accounts.store_profile(username, &self.profile);
        }
    }

    // ========================================================================
    // Turn plumbing
    // ========================================================================

    fn push_user_turn(
        &mut self,
        text: String,
        progress: &mut (dyn FnMut(Progress<'_>) + Send),
    ) {
        self.transcript.push(ChatMessage::user(text));
        progress(Progress::Snapshot(self.view()));
    }

    async fn generate(&self, request: ModelRequest) -> Result<String, ModelError> {
        let request = request.with_settings(&self.config.generation);
        debug!(
            model = self.model_name(),
            prompt_chars = request.prompt_chars(),
            "generating reply"
        );
        let reply = self.model.generate(request).await?;
        debug!(reply_chars = reply.len(), "reply received");
        Ok(reply)
    }

    /// Append the assistant reply, or undo the pending user turn on failure.
    fn finish_turn(&mut self, reply: Result<String, ModelError>) -> Result<(), SessionError> {
        match reply {
            Ok(text) => {
                self.transcript.push(ChatMessage::assistant(text));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "model call failed, rolling back user turn");
                self.transcript.rollback_user_turn();
                Err(e.into())
            }
        }
    }

    fn reset(&mut self) {
        info!("session reset");
        self.transcript.clear();
        self.training_active = false;
        self.game_started = false;
        if self.config.variant == Variant::Party {
            self.show_intro = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    fn session(variant: Variant, model: ScriptedModel) -> ChatSession {
        ChatSession::new(SessionConfig::new(variant).with_dice_seed(7), Arc::new(model))
    }

    #[tokio::test]
    async fn test_blank_submit_is_ignored() {
        let model = ScriptedModel::new(vec![]);
        let mut session = session(Variant::Clone, model.clone());

        session
            .handle_quiet(SessionEvent::Submit("   \n".into()))
            .await
            .unwrap();

        assert!(session.transcript().is_empty());
        assert_eq!(model.request_count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_action() {
        let mut session = session(Variant::Clone, ScriptedModel::new(vec![]));
        let err = session
            .handle_quiet(SessionEvent::Roll(DiceRequest::ABILITY_SCORE))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Unsupported {
                variant: Variant::Clone,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_snapshot_precedes_reply() {
        let model = ScriptedModel::new(vec!["Hello there!"]);
        let mut session = session(Variant::Clone, model);

        let mut snapshots = Vec::new();
        session
            .handle(SessionEvent::Submit("hi".into()), |p| {
                if let Progress::Snapshot(view) = p {
                    snapshots.push(view);
                }
            })
            .await
            .unwrap();

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].messages, vec![ChatMessage::user("hi")]);
        assert_eq!(session.transcript().len(), 2);
    }

    #[test]
    fn test_model_error_message_per_variant() {
        let err = SessionError::Model(ModelError::RateLimited("slow down".into()));
        assert!(err
            .user_message(Variant::Solo)
            .starts_with("A critical quest failure (API error) occurred:"));
        assert!(err.user_message(Variant::Echo).contains("slow down"));
        assert!(err.is_model_failure());
        assert_eq!(
            SessionError::NotLoggedIn.user_message(Variant::Echo),
            "Please sign in to load your personal style profile."
        );
    }

    #[test]
    fn test_view_roll_defaults() {
        let view = session(Variant::Solo, ScriptedModel::new(vec![])).view();
        assert_eq!(view.last_roll_label(), NO_ROLL_LABEL);
        assert_eq!(view.roll_details(), NO_ROLL_DETAILS);
        assert_eq!(view.sheet, CharacterSheet::default());
    }
}
