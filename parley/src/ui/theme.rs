//! Color theme and styling for the chat TUI

use parley_core::{Role, RollResult};
use ratatui::style::{Color, Modifier, Style};

/// Chat UI color theme
#[derive(Debug, Clone)]
pub struct ChatTheme {
    // Base colors
    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,
    pub accent: Color,

    // Transcript colors
    pub user_text: Color,
    pub assistant_text: Color,
    pub system_text: Color,
    pub scenario_text: Color,
    pub error_text: Color,

    // Roll result colors
    pub crit_success: Color,
    pub crit_failure: Color,
}

impl Default for ChatTheme {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            accent: Color::Yellow,

            user_text: Color::Cyan,
            assistant_text: Color::White,
            system_text: Color::DarkGray,
            scenario_text: Color::Yellow,
            error_text: Color::LightRed,

            crit_success: Color::Yellow,
            crit_failure: Color::Red,
        }
    }
}

impl ChatTheme {
    /// Get style for a transcript message
    pub fn role_style(&self, role: Role) -> Style {
        match role {
            Role::User => self.user_style(),
            Role::Assistant => Style::default().fg(self.assistant_text),
            Role::System => self.system_style(),
            Role::Scenario => Style::default()
                .fg(self.scenario_text)
                .add_modifier(Modifier::BOLD),
        }
    }

    /// Get style for user turns and the input prompt
    pub fn user_style(&self) -> Style {
        Style::default()
            .fg(self.user_text)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn system_style(&self) -> Style {
        Style::default()
            .fg(self.system_text)
            .add_modifier(Modifier::DIM)
    }

    pub fn error_style(&self) -> Style {
        Style::default()
            .fg(self.error_text)
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for section headings in the sidebar
    pub fn heading_style(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for a roll total. A single die showing its maximum or a 1 stands out.
    pub fn roll_result_style(&self, result: &RollResult) -> Style {
        let single = result.request.num_dice == 1;
        if single && result.total == result.request.sides {
            Style::default()
                .fg(self.crit_success)
                .add_modifier(Modifier::BOLD)
        } else if single && result.total == 1 {
            Style::default()
                .fg(self.crit_failure)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.foreground)
        }
    }

    /// Get border style
    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }
}
