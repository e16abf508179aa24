//! Party intro panel shown until the adventure begins

use parley_core::persona::PARTY_INTRO;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::ui::theme::ChatTheme;

pub struct IntroWidget<'a> {
    title: &'a str,
    theme: &'a ChatTheme,
}

impl<'a> IntroWidget<'a> {
    pub fn new(title: &'a str, theme: &'a ChatTheme) -> Self {
        Self { title, theme }
    }
}

impl Widget for IntroWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(format!(" {} ", self.title))
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(true));

        let mut lines = vec![
            Line::from(Span::styled(
                "Welcome, Adventurer!",
                self.theme.heading_style(),
            )),
            Line::from(""),
        ];
        lines.extend(PARTY_INTRO.lines().map(Line::from));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press b (or :begin) to begin the adventure.",
            Style::default().add_modifier(Modifier::BOLD),
        )));

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
