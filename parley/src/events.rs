//! Event handling for the chat TUI

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use parley_core::{DiceRequest, DieType, SessionEvent, Variant};

use crate::app::{App, InputMode};
use crate::ui::Overlay;

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
}

/// Handle a terminal event
pub fn handle_event(app: &mut App, event: Event) -> EventResult {
    match event {
        Event::Key(key) => handle_key_event(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

/// Handle a mouse event
fn handle_mouse_event(app: &mut App, mouse: MouseEvent) -> EventResult {
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            app.scroll_up(3);
            EventResult::NeedsRedraw
        }
        MouseEventKind::ScrollDown => {
            app.scroll_down(3);
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

/// Handle a key event
fn handle_key_event(app: &mut App, key: KeyEvent) -> EventResult {
    // Handle overlay keys first
    if app.has_overlay() {
        return handle_overlay_key(app, key);
    }

    // Global shortcuts (always work)
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        return EventResult::Quit;
    }

    // Route based on input mode
    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Insert => handle_insert_mode(app, key),
        InputMode::Command => handle_command_mode(app, key),
    }
}

/// Handle keys in NORMAL mode (vim-style navigation and hotkeys)
fn handle_normal_mode(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        // Mode switching
        KeyCode::Char('i') => {
            app.input_mode = InputMode::Insert;
            EventResult::NeedsRedraw
        }
        KeyCode::Char('a') => {
            // Append mode - go to insert at end
            app.input_mode = InputMode::Insert;
            app.cursor_end();
            EventResult::NeedsRedraw
        }
        KeyCode::Char(':') => {
            app.enter_command_mode();
            EventResult::NeedsRedraw
        }

        // Help
        KeyCode::Char('?') | KeyCode::F(1) => {
            app.toggle_help();
            EventResult::NeedsRedraw
        }

        // Quit
        KeyCode::Char('q') => EventResult::Quit,

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => {
            app.scroll_down(1);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.scroll_up(1);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('G') => {
            app.scroll_to_bottom();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('g') => {
            app.scroll_to_top();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(10);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(10);
            EventResult::NeedsRedraw
        }
        KeyCode::PageUp => {
            app.scroll_up(20);
            EventResult::NeedsRedraw
        }
        KeyCode::PageDown => {
            app.scroll_down(20);
            EventResult::NeedsRedraw
        }

        _ => handle_variant_hotkeys(app, key),
    }
}

/// Handle hotkeys that only make sense for some variants (normal mode)
fn handle_variant_hotkeys(app: &mut App, key: KeyEvent) -> EventResult {
    let variant = app.view.variant;

    let event = match key.code {
        KeyCode::Char(c @ '1'..='6') if variant.uses_dice() => {
            let index = c as usize - '1' as usize;
            SessionEvent::Roll(DieType::ALL[index].request())
        }
        KeyCode::Char('A') if variant == Variant::Solo => {
            SessionEvent::Roll(DiceRequest::ABILITY_SCORE)
        }
        KeyCode::Char('r') if variant.uses_dice() => SessionEvent::ToggleRules,
        KeyCode::Char('b') if variant == Variant::Party => SessionEvent::BeginAdventure,
        KeyCode::Char('t') if variant == Variant::Echo => SessionEvent::StartTraining,
        KeyCode::Char('T') if variant == Variant::Echo => SessionEvent::EndTraining,
        _ => return EventResult::Continue,
    };

    app.send_event(event);
    EventResult::NeedsRedraw
}

/// Handle keys in INSERT mode (free text input)
fn handle_insert_mode(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        // Exit insert mode
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            EventResult::NeedsRedraw
        }

        // Submit input
        KeyCode::Enter => {
            if app.busy {
                app.set_status("Please wait for the current reply...");
            } else if let Some(input) = app.submit_input() {
                app.send_chat(input);
            }
            EventResult::NeedsRedraw
        }

        // Input editing
        KeyCode::Left => {
            app.cursor_left();
            EventResult::NeedsRedraw
        }
        KeyCode::Right => {
            app.cursor_right();
            EventResult::NeedsRedraw
        }
        KeyCode::Home => {
            app.cursor_home();
            EventResult::NeedsRedraw
        }
        KeyCode::End => {
            app.cursor_end();
            EventResult::NeedsRedraw
        }
        KeyCode::Backspace => {
            app.backspace();
            EventResult::NeedsRedraw
        }
        KeyCode::Delete => {
            app.delete();
            EventResult::NeedsRedraw
        }
        KeyCode::Up => {
            app.history_prev();
            EventResult::NeedsRedraw
        }
        KeyCode::Down => {
            app.history_next();
            EventResult::NeedsRedraw
        }

        // Character input
        KeyCode::Char(c) => {
            app.type_char(c);
            EventResult::NeedsRedraw
        }

        _ => EventResult::Continue,
    }
}

/// Handle keys in COMMAND mode (: commands)
fn handle_command_mode(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        // Exit command mode
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.clear_input();
            EventResult::NeedsRedraw
        }

        // Execute command
        KeyCode::Enter => {
            let command = app.input_buffer().to_string();
            app.clear_input();
            app.input_mode = InputMode::Normal;

            if command.len() > 1 {
                app.process_command(&command);
            }

            if app.should_quit {
                EventResult::Quit
            } else {
                EventResult::NeedsRedraw
            }
        }

        // Input editing
        KeyCode::Left => {
            if app.cursor_position() > 1 {
                app.cursor_left();
            }
            EventResult::NeedsRedraw
        }
        KeyCode::Right => {
            app.cursor_right();
            EventResult::NeedsRedraw
        }
        KeyCode::Backspace => {
            if app.cursor_position() > 1 {
                app.backspace();
            } else {
                // Backspace on just ":" exits command mode
                app.input_mode = InputMode::Normal;
                app.clear_input();
            }
            EventResult::NeedsRedraw
        }

        // Character input
        KeyCode::Char(c) => {
            app.type_char(c);
            EventResult::NeedsRedraw
        }

        _ => EventResult::Continue,
    }
}

/// Handle key when overlay is open
fn handle_overlay_key(app: &mut App, key: KeyEvent) -> EventResult {
    // Keep the dice overlay up until the result is revealed
    if app.is_rolling() {
        return EventResult::Continue;
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => {
            app.close_overlay();
            EventResult::NeedsRedraw
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            if matches!(app.overlay(), Some(Overlay::DiceRoll { .. })) {
                app.close_overlay();
            }
            EventResult::NeedsRedraw
        }
        KeyCode::Char('?') if matches!(app.overlay(), Some(Overlay::Help)) => {
            app.close_overlay();
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}
