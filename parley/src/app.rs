//! Main application state and logic

use std::collections::VecDeque;

use parley_core::{DiceRequest, RollResult, SessionEvent, SessionView};
use tokio::sync::mpsc;

use crate::ai_worker::{WorkerRequest, WorkerResponse};
use crate::commands::{parse_command, Command};
use crate::ui::theme::ChatTheme;
use crate::ui::Overlay;

/// Frames (~100ms each) the dice spin before the result is revealed.
const ROLL_ANIMATION_FRAMES: u8 = 8;

/// Vim-style input modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Normal mode - navigation and hotkeys (default)
    #[default]
    Normal,
    /// Insert mode - free text input
    Insert,
    /// Command mode - entering : commands
    Command,
}

/// State for a dice roll in progress (for animation)
#[derive(Debug, Clone)]
pub struct RollingDice {
    pub request: DiceRequest,
    /// Number of animation frames elapsed
    pub frames_elapsed: u8,
    /// The result once the worker has reported it
    pub result: Option<RollResult>,
}

/// Main application state
pub struct App {
    // Channel communication with the session worker
    pub request_tx: mpsc::Sender<WorkerRequest>,
    pub response_rx: mpsc::Receiver<WorkerResponse>,

    // Latest session snapshot for rendering
    pub view: SessionView,

    // UI state
    pub theme: ChatTheme,
    overlay: Option<Overlay>,

    // Transcript display
    pub transcript_scroll: usize,
    pub streaming_text: Option<String>,
    pub scroll_locked_to_bottom: bool,
    inline_error: Option<String>,

    // Input state
    pub input_mode: InputMode,
    input_buffer: String,
    cursor_position: usize,
    pub input_history: VecDeque<String>,
    pub history_index: Option<usize>,
    pub saved_input: Option<String>,

    // Status
    status_message: Option<String>,
    pub should_quit: bool,

    // Animation
    pub animation_frame: u8,
    rolling_dice: Option<RollingDice>,

    /// An event is being handled by the worker
    pub busy: bool,
}

impl App {
    /// Create a new application with channel endpoints and the initial view
    pub fn new(
        request_tx: mpsc::Sender<WorkerRequest>,
        response_rx: mpsc::Receiver<WorkerResponse>,
        view: SessionView,
    ) -> Self {
        let mut app = Self {
            request_tx,
            response_rx,
            view,
            theme: ChatTheme::default(),
            overlay: None,
            transcript_scroll: 0,
            streaming_text: None,
            scroll_locked_to_bottom: true,
            inline_error: None,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            cursor_position: 0,
            input_history: VecDeque::with_capacity(100),
            history_index: None,
            saved_input: None,
            status_message: None,
            should_quit: false,
            animation_frame: 0,
            rolling_dice: None,
            busy: false,
        };
        app.set_status("Press 'i' to type, ':' for commands, '?' for help");
        app
    }

    /// Enter command mode (starts with :)
    pub fn enter_command_mode(&mut self) {
        self.input_mode = InputMode::Command;
        self.input_buffer.clear();
        self.input_buffer.push(':');
        self.cursor_position = 1;
    }

    // =========================================================================
    // Worker communication
    // =========================================================================

    /// Send a session event to the worker. Returns false if it was not sent.
    pub fn send_event(&mut self, event: SessionEvent) -> bool {
        if self.busy {
            self.set_status("Please wait for the current reply...");
            return false;
        }

        let roll = match &event {
            SessionEvent::Roll(request) => Some(*request),
            _ => None,
        };

        if self.request_tx.try_send(WorkerRequest::Event(event)).is_err() {
            self.set_status("Worker busy, please wait...");
            return false;
        }

        self.busy = true;
        self.inline_error = None;
        self.clear_status();
        if let Some(request) = roll {
            self.start_dice_animation(request);
        }
        true
    }

    /// Submit chat input
    pub fn send_chat(&mut self, input: String) {
        if input.trim().is_empty() {
            return;
        }
        if self.send_event(SessionEvent::Submit(input)) {
            self.scroll_to_bottom();
        }
    }

    /// Drain every pending worker response
    pub fn poll_worker(&mut self) {
        while let Ok(response) = self.response_rx.try_recv() {
            self.apply_response(response);
        }
    }

    /// Apply one worker response
    pub fn apply_response(&mut self, response: WorkerResponse) {
        match response {
            WorkerResponse::Fragment(text) => self.append_streaming_text(&text),
            WorkerResponse::View { view, done } => {
                // Any view produced while rolling already carries the new roll,
                // even when it equals the previous one.
                if let Some(rolling) = &mut self.rolling_dice {
                    rolling.result = view.last_roll.clone();
                }
                self.set_view(view);
                if done {
                    self.finish_event();
                }
            }
            WorkerResponse::Failed { message, view } => {
                // A failed roll is undone, so there is nothing to reveal.
                if let Some(rolling) = &mut self.rolling_dice {
                    rolling.result = None;
                }
                self.set_view(view);
                self.inline_error = Some(message);
                self.finish_event();
                self.scroll_to_bottom();
            }
            WorkerResponse::Rejected(message) => {
                self.set_status(message.clone());
                self.inline_error = Some(message);
                self.finish_event();
            }
        }
    }

    fn set_view(&mut self, view: SessionView) {
        if let Some(notice) = &view.notice {
            self.set_status(notice.clone());
        }
        let grew = view.messages.len() > self.view.messages.len();
        self.view = view;
        if grew && self.scroll_locked_to_bottom {
            self.scroll_to_bottom();
        }
    }

    fn finish_event(&mut self) {
        self.busy = false;
        // The final view already holds the streamed reply
        self.streaming_text = None;

        let roll_failed = self
            .rolling_dice
            .as_ref()
            .is_some_and(|rolling| rolling.result.is_none());
        if roll_failed {
            self.rolling_dice = None;
            self.close_overlay();
        }
    }

    /// Append text to the streaming buffer
    pub fn append_streaming_text(&mut self, text: &str) {
        match &mut self.streaming_text {
            Some(existing) => existing.push_str(text),
            None => self.streaming_text = Some(text.to_string()),
        }
        if self.scroll_locked_to_bottom {
            self.scroll_to_bottom();
        }
    }

    // =========================================================================
    // Scrolling
    // =========================================================================

    /// Scroll transcript to bottom and lock to bottom
    pub fn scroll_to_bottom(&mut self) {
        // The widget caps this to the real maximum
        self.transcript_scroll = usize::MAX / 2;
        self.scroll_locked_to_bottom = true;
    }

    /// Jump to the first message
    pub fn scroll_to_top(&mut self) {
        self.transcript_scroll = 0;
        self.scroll_locked_to_bottom = false;
    }

    /// Estimate max scroll assuming ~60 columns of text
    fn estimate_max_scroll(&self) -> usize {
        const ESTIMATED_WIDTH: usize = 60;
        const ESTIMATED_VISIBLE_HEIGHT: usize = 20;

        let estimated_lines: usize = self
            .view
            .messages
            .iter()
            .map(|message| {
                message
                    .content
                    .lines()
                    .map(|line| (line.chars().count() / ESTIMATED_WIDTH).max(1))
                    .sum::<usize>()
                    + 1
            })
            .sum();

        estimated_lines.saturating_sub(ESTIMATED_VISIBLE_HEIGHT)
    }

    /// Scroll transcript up (unlocks from bottom)
    pub fn scroll_up(&mut self, lines: usize) {
        let max_scroll = self.estimate_max_scroll();
        if self.transcript_scroll > max_scroll {
            self.transcript_scroll = max_scroll;
        }
        self.transcript_scroll = self.transcript_scroll.saturating_sub(lines);
        self.scroll_locked_to_bottom = false;
    }

    /// Scroll transcript down
    pub fn scroll_down(&mut self, lines: usize) {
        self.transcript_scroll = self.transcript_scroll.saturating_add(lines);
        let max_scroll = self.estimate_max_scroll();
        self.transcript_scroll = self.transcript_scroll.min(max_scroll + 100);
    }

    // =========================================================================
    // Input editing
    // =========================================================================

    /// Take the current input, recording chat lines in history
    pub fn submit_input(&mut self) -> Option<String> {
        if self.input_buffer.is_empty() {
            return None;
        }

        let input = std::mem::take(&mut self.input_buffer);
        self.cursor_position = 0;

        if !input.starts_with(':') {
            self.input_history.push_front(input.clone());
            if self.input_history.len() > 100 {
                self.input_history.pop_back();
            }
        }
        self.history_index = None;
        self.saved_input = None;

        Some(input)
    }

    /// Handle a typed character (unicode-safe)
    pub fn type_char(&mut self, c: char) {
        let byte_pos = self
            .input_buffer
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.input_buffer.len());
        self.input_buffer.insert(byte_pos, c);
        self.cursor_position += 1;
    }

    /// Handle backspace (unicode-safe)
    pub fn backspace(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position)
            {
                self.input_buffer
                    .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
            }
        }
    }

    /// Handle delete (unicode-safe)
    pub fn delete(&mut self) {
        if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position) {
            self.input_buffer
                .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input_buffer.chars().count();
        self.cursor_position = (self.cursor_position + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor_position = self.input_buffer.chars().count();
    }

    /// Navigate to previous input in history
    pub fn history_prev(&mut self) {
        if self.input_history.is_empty() {
            return;
        }

        if self.history_index.is_none() && !self.input_buffer.is_empty() {
            self.saved_input = Some(self.input_buffer.clone());
        }

        let idx = match self.history_index {
            None => 0,
            Some(i) if i + 1 < self.input_history.len() => i + 1,
            Some(i) => i,
        };

        if let Some(entry) = self.input_history.get(idx) {
            self.input_buffer = entry.clone();
            self.cursor_position = self.input_buffer.chars().count();
            self.history_index = Some(idx);
        }
    }

    /// Navigate to next input in history
    pub fn history_next(&mut self) {
        match self.history_index {
            None => {}
            Some(0) => {
                self.input_buffer = self.saved_input.take().unwrap_or_default();
                self.cursor_position = self.input_buffer.chars().count();
                self.history_index = None;
            }
            Some(i) => {
                if let Some(entry) = self.input_history.get(i - 1) {
                    self.input_buffer = entry.clone();
                    self.cursor_position = self.input_buffer.chars().count();
                    self.history_index = Some(i - 1);
                }
            }
        }
    }

    // =========================================================================
    // Commands and overlays
    // =========================================================================

    /// Process a colon command
    pub fn process_command(&mut self, command: &str) {
        match parse_command(command) {
            Ok(Command::Quit) => self.should_quit = true,
            Ok(Command::Help) => self.toggle_help(),
            Ok(Command::Status) => {
                let status = format!(
                    "{} | {} | {} messages",
                    self.view.variant.title(),
                    self.view.model,
                    self.view.messages.len()
                );
                self.set_status(status);
            }
            Ok(Command::Event(event)) => {
                self.send_event(event);
            }
            Err(e) => self.set_status(e.to_string()),
        }
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        if matches!(self.overlay, Some(Overlay::Help)) {
            self.overlay = None;
        } else {
            self.overlay = Some(Overlay::Help);
        }
    }

    /// Close any open overlay
    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    fn start_dice_animation(&mut self, request: DiceRequest) {
        self.rolling_dice = Some(RollingDice {
            request,
            frames_elapsed: 0,
            result: None,
        });
        self.overlay = Some(Overlay::DiceRoll {
            result: None,
            purpose: request.notation(),
        });
    }

    /// Tick for animations
    pub fn tick(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);

        let Some(rolling) = &mut self.rolling_dice else {
            return;
        };
        rolling.frames_elapsed = rolling.frames_elapsed.saturating_add(1);

        if rolling.frames_elapsed >= ROLL_ANIMATION_FRAMES && rolling.result.is_some() {
            let purpose = rolling.request.notation();
            let result = rolling.result.take();
            self.overlay = Some(Overlay::DiceRoll { result, purpose });
            self.rolling_dice = None;
        }
    }

    /// Whether the dice overlay is still spinning
    pub fn is_rolling(&self) -> bool {
        self.rolling_dice.is_some()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Set status message (always overwrites)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn inline_error(&self) -> Option<&str> {
        self.inline_error.as_deref()
    }

    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    pub fn clear_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
    }
}
