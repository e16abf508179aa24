//! Transcript display widget

use parley_core::{ChatMessage, Role};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::scrollbar,
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
        StatefulWidget, Widget, Wrap,
    },
};

use crate::ui::theme::ChatTheme;

/// Widget for displaying the chat transcript
pub struct TranscriptWidget<'a> {
    messages: &'a [ChatMessage],
    scroll: usize,
    theme: &'a ChatTheme,
    title: &'a str,
    streaming_text: Option<&'a str>,
    pending: Option<&'a str>,
    error: Option<&'a str>,
}

impl<'a> TranscriptWidget<'a> {
    pub fn new(messages: &'a [ChatMessage], theme: &'a ChatTheme) -> Self {
        Self {
            messages,
            scroll: 0,
            theme,
            title: " Chat ",
            streaming_text: None,
            pending: None,
            error: None,
        }
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn title(mut self, title: &'a str) -> Self {
        self.title = title;
        self
    }

    pub fn streaming(mut self, text: Option<&'a str>) -> Self {
        self.streaming_text = text;
        self
    }

    /// Label shown while a reply is on its way and nothing has streamed yet
    pub fn pending(mut self, label: Option<&'a str>) -> Self {
        self.pending = label;
        self
    }

    /// Inline error from the last event
    pub fn error(mut self, error: Option<&'a str>) -> Self {
        self.error = error;
        self
    }

    /// Build the display lines. Exposed for scroll estimation in tests.
    pub fn lines(&self) -> Vec<Line<'a>> {
        let mut lines: Vec<Line> = Vec::new();

        for message in self.messages {
            let style = self.theme.role_style(message.role);
            let prefix = match message.role {
                Role::User => "> ",
                Role::Scenario => "Scenario: ",
                Role::Assistant | Role::System => "",
            };

            for (i, line) in message.content.lines().enumerate() {
                let text = if i == 0 {
                    format!("{prefix}{line}")
                } else {
                    line.to_string()
                };
                lines.push(Line::from(Span::styled(text, style)));
            }

            lines.push(Line::from(""));
        }

        if let Some(streaming) = self.streaming_text {
            let style = self
                .theme
                .role_style(Role::Assistant)
                .add_modifier(Modifier::DIM);
            for line in streaming.lines() {
                lines.push(Line::from(Span::styled(line.to_string(), style)));
            }
            lines.push(Line::from(Span::styled("▌", style)));
        } else if let Some(pending) = self.pending {
            lines.push(Line::from(Span::styled(pending, self.theme.system_style())));
        }

        if let Some(error) = self.error {
            lines.push(Line::from(Span::styled(error, self.theme.error_style())));
        }

        lines
    }
}

impl Widget for TranscriptWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(self.title)
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(true));

        let inner = block.inner(area);
        block.render(area, buf);

        let lines = self.lines();

        let visible_height = inner.height as usize;
        let total_lines = lines.len();
        let max_scroll = total_lines.saturating_sub(visible_height);
        let scroll = self.scroll.min(max_scroll);

        Paragraph::new(lines)
            .scroll((scroll as u16, 0))
            .wrap(Wrap { trim: false })
            .render(inner, buf);

        if total_lines > visible_height {
            let scrollbar_area = Rect {
                x: inner.x + inner.width.saturating_sub(1),
                y: inner.y,
                width: 1,
                height: inner.height,
            };

            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .symbols(scrollbar::VERTICAL)
                .thumb_style(Style::default().fg(Color::DarkGray))
                .track_style(Style::default().fg(Color::Black))
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"));

            let mut scrollbar_state = ScrollbarState::new(max_scroll).position(scroll);
            scrollbar.render(scrollbar_area, buf, &mut scrollbar_state);

            // Hint at bottom if more content below
            if scroll < max_scroll {
                let hint = format!(" ↓{} more ", max_scroll - scroll);
                let hint_y = inner.y + inner.height.saturating_sub(1);
                let hint_style = Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::DIM);
                for (i, ch) in hint.chars().enumerate() {
                    let x = inner.x + (i as u16);
                    if x < inner.x + inner.width.saturating_sub(2) {
                        buf[(x, hint_y)].set_char(ch).set_style(hint_style);
                    }
                }
            }
        }
    }
}
