//! Status bar and hotkey bar widgets

use parley_core::{SessionView, Variant};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::app::InputMode;
use crate::ui::theme::ChatTheme;

/// Status bar widget showing mode, variant and the latest message
pub struct StatusBarWidget<'a> {
    view: &'a SessionView,
    input_mode: InputMode,
    theme: &'a ChatTheme,
    message: Option<&'a str>,
    busy: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(view: &'a SessionView, input_mode: InputMode, theme: &'a ChatTheme) -> Self {
        Self {
            view,
            input_mode,
            theme,
            message: None,
            busy: false,
        }
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }

    pub fn busy(mut self, busy: bool) -> Self {
        self.busy = busy;
        self
    }

    fn line(&self) -> Line<'a> {
        let (input_mode_text, input_mode_style) = match self.input_mode {
            InputMode::Normal => (
                "NORMAL",
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            ),
            InputMode::Insert => (
                "INSERT",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            InputMode::Command => (
                "COMMAND",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        };

        let mut spans = vec![
            Span::styled(format!("-- {input_mode_text} --"), input_mode_style),
            Span::raw(" | "),
            Span::styled(self.view.variant.name(), self.theme.heading_style()),
            Span::raw(" | "),
            Span::styled(
                self.view.model.as_str(),
                Style::default().add_modifier(Modifier::DIM),
            ),
        ];

        if self.view.variant == Variant::Echo && self.view.training_active {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled("TRAINING", self.theme.role_style(parley_core::Role::Scenario)));
        }

        if self.busy {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(
                self.view.variant.pending_label(),
                Style::default().fg(self.theme.accent),
            ));
        } else if let Some(msg) = self.message {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(
                msg,
                Style::default().add_modifier(Modifier::DIM),
            ));
        }

        Line::from(spans)
    }
}

impl Widget for StatusBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.line()).render(area, buf);
    }
}

/// Hotkey bar widget
pub struct HotkeyBarWidget {
    variant: Variant,
    input_mode: InputMode,
    show_intro: bool,
}

impl HotkeyBarWidget {
    pub fn new(variant: Variant, input_mode: InputMode, show_intro: bool) -> Self {
        Self {
            variant,
            input_mode,
            show_intro,
        }
    }

    fn hotkeys(&self) -> Vec<(&'static str, bool)> {
        match self.input_mode {
            InputMode::Normal => match self.variant {
                Variant::Party if self.show_intro => vec![
                    ("b:begin adventure", true),
                    ("?:help", false),
                    ("q:quit", false),
                ],
                Variant::Party => vec![
                    ("i:insert", true),
                    ("1-6:roll d4..d20", true),
                    ("r:rules", true),
                    ("j/k:scroll", false),
                    ("?:help", false),
                ],
                Variant::Solo => vec![
                    ("i:insert", true),
                    ("1-6:roll", true),
                    ("A:4d6 drop lowest", true),
                    ("r:rules", false),
                    ("?:help", false),
                ],
                Variant::Echo => vec![
                    ("i:insert", true),
                    ("t:train", true),
                    ("T:end training", true),
                    ("::command", true),
                    ("?:help", false),
                ],
                Variant::Clone => vec![
                    ("i:insert", true),
                    ("::command", true),
                    ("j/k:scroll", true),
                    ("?:help", false),
                ],
            },
            InputMode::Insert => vec![
                ("Esc:normal", true),
                ("Enter:send", true),
                ("↑↓:history", false),
            ],
            InputMode::Command => vec![
                ("Esc:cancel", true),
                ("Enter:execute", true),
                (":q quit", false),
                (":roll 4d6dl1", false),
                (":help", false),
            ],
        }
    }
}

impl Widget for HotkeyBarWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let spans: Vec<Span> = self
            .hotkeys()
            .into_iter()
            .flat_map(|(text, primary)| {
                let style = if primary {
                    Style::default()
                } else {
                    Style::default().add_modifier(Modifier::DIM)
                };
                [Span::styled(text, style), Span::raw("  ")]
            })
            .collect();

        Paragraph::new(Line::from(spans)).render(area, buf);
    }
}
