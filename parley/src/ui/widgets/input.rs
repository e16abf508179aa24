//! Input line widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::ui::theme::ChatTheme;

/// Input line widget
pub struct InputWidget<'a> {
    content: &'a str,
    cursor_position: usize,
    theme: &'a ChatTheme,
    placeholder: &'a str,
    is_active: bool,
    is_command_mode: bool,
}

impl<'a> InputWidget<'a> {
    pub fn new(content: &'a str, theme: &'a ChatTheme) -> Self {
        Self {
            content,
            cursor_position: content.chars().count(),
            theme,
            placeholder: "",
            is_active: true,
            is_command_mode: false,
        }
    }

    pub fn cursor_position(mut self, pos: usize) -> Self {
        self.cursor_position = pos;
        self
    }

    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    pub fn command_mode(mut self, is_command: bool) -> Self {
        self.is_command_mode = is_command;
        self
    }

    fn line(&self) -> Line<'a> {
        if self.content.is_empty() && !self.is_command_mode {
            return Line::from(vec![
                Span::styled("> ", self.theme.user_style()),
                Span::styled(
                    self.placeholder,
                    Style::default().add_modifier(Modifier::DIM),
                ),
            ]);
        }

        let prefix = if self.is_command_mode { ":" } else { "> " };
        let display_content = if self.is_command_mode {
            self.content.strip_prefix(':').unwrap_or(self.content)
        } else {
            self.content
        };
        let cursor = if self.is_command_mode {
            self.cursor_position.saturating_sub(1)
        } else {
            self.cursor_position
        };

        // Character-based slicing keeps multi-byte input intact
        let before_cursor: String = display_content.chars().take(cursor).collect();
        let at_cursor = display_content
            .chars()
            .nth(cursor)
            .map(|c| c.to_string())
            .unwrap_or_else(|| " ".to_string());
        let after_cursor: String = display_content.chars().skip(cursor + 1).collect();

        let cursor_style = if self.is_active {
            Style::default()
                .add_modifier(Modifier::UNDERLINED | Modifier::BOLD)
                .fg(self.theme.user_text)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::styled(prefix, self.theme.user_style()),
            Span::raw(before_cursor),
            Span::styled(at_cursor, cursor_style),
            Span::raw(after_cursor),
        ])
    }
}

impl Widget for InputWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.is_active));

        let inner = block.inner(area);
        block.render(area, buf);

        Paragraph::new(self.line()).render(inner, buf);
    }
}
