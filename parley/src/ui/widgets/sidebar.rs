//! Variant sidebar: account and profile for echo, roster and dice for the
//! party, roll history and character sheet for the solo adventure.

use parley_core::persona::{PARTY_ROSTER, PARTY_RULES, SOLO_RULES};
use parley_core::session::NO_ROLL_DETAILS;
use parley_core::{DieType, SessionView, SheetField, Variant};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::ui::theme::ChatTheme;

/// Sidebar widget
pub struct SidebarWidget<'a> {
    view: &'a SessionView,
    theme: &'a ChatTheme,
}

impl<'a> SidebarWidget<'a> {
    pub fn new(view: &'a SessionView, theme: &'a ChatTheme) -> Self {
        Self { view, theme }
    }

    fn heading(&self, text: &'a str) -> Line<'a> {
        Line::from(Span::styled(text, self.theme.heading_style()))
    }

    fn dim(text: impl Into<String>) -> Line<'a> {
        Line::from(Span::styled(
            text.into(),
            Style::default().add_modifier(Modifier::DIM),
        ))
    }

    fn dice_keys(&self, lines: &mut Vec<Line<'a>>) {
        lines.push(self.heading("Dice Roller"));
        let keys: Vec<String> = DieType::ALL
            .iter()
            .enumerate()
            .map(|(i, die)| format!("{}:{die}", i + 1))
            .collect();
        lines.push(Line::from(keys.join(" ")));
        if self.view.variant == Variant::Solo {
            lines.push(Line::from("A:4d6 drop lowest"));
        }
        lines.push(Line::from(""));
    }

    fn tone(&self, lines: &mut Vec<Line<'a>>) {
        lines.push(self.heading("Tone"));
        lines.push(Line::from(self.view.tone.to_string()));
        lines.push(Self::dim(":tone friendly|formal|funny"));
        lines.push(Line::from(""));
    }

    fn rules(&self, lines: &mut Vec<Line<'a>>) {
        if !self.view.rules_visible {
            lines.push(Self::dim("r: show rules"));
            return;
        }
        lines.push(self.heading("Rules"));
        match self.view.variant {
            Variant::Party => {
                for rule in PARTY_RULES {
                    lines.push(Line::from(format!("• {rule}")));
                }
            }
            _ => lines.push(Line::from(SOLO_RULES)),
        }
    }

    /// Build the display lines
    pub fn lines(&self) -> Vec<Line<'a>> {
        let view = self.view;
        let mut lines: Vec<Line> = Vec::new();

        match view.variant {
            Variant::Clone => {
                self.tone(&mut lines);
                lines.push(self.heading("Model"));
                lines.push(Line::from(view.model.as_str()));
            }
            Variant::Echo => {
                lines.push(self.heading("Account"));
                match &view.username {
                    Some(username) => {
                        lines.push(Line::from(format!("Signed in as {username}")));
                        lines.push(Self::dim(":logout"));
                    }
                    None => {
                        lines.push(Line::from("Not signed in"));
                        lines.push(Self::dim(":login USER PASS"));
                    }
                }
                lines.push(Line::from(""));

                lines.push(self.heading("Style Profile"));
                lines.push(Line::from(view.profile.as_str()));
                lines.push(Line::from(""));

                lines.push(self.heading("Training"));
                if view.training_active {
                    lines.push(Line::from(Span::styled(
                        "ACTIVE: reply to the scenario",
                        self.theme.role_style(parley_core::Role::Scenario),
                    )));
                    lines.push(Self::dim("T: end training"));
                } else {
                    lines.push(Self::dim("t: start a training scenario"));
                }
                lines.push(Line::from(""));

                self.tone(&mut lines);
            }
            Variant::Party => {
                lines.push(self.heading("Your Party"));
                lines.push(Line::from("You (Player)"));
                for (name, description) in PARTY_ROSTER {
                    lines.push(Line::from(format!("{name} ({description})")));
                }
                lines.push(Line::from(""));

                self.dice_keys(&mut lines);
                if let Some(roll) = &view.last_roll {
                    lines.push(Line::from(format!("Last: {}", roll.label())));
                    lines.push(Line::from(""));
                }
                self.rules(&mut lines);
            }
            Variant::Solo => {
                lines.push(self.heading("Last Roll"));
                lines.push(Line::from(Span::styled(
                    view.last_roll_label(),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                let details = view.roll_details();
                if details == NO_ROLL_DETAILS {
                    lines.push(Self::dim("Press a dice key to roll."));
                } else {
                    lines.push(Self::dim(details));
                }
                lines.push(Line::from(""));

                self.dice_keys(&mut lines);

                lines.push(self.heading("Character Sheet"));
                for field in SheetField::ALL {
                    lines.push(Line::from(vec![
                        Span::styled(
                            format!("{}: ", field.label()),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                        Span::raw(view.sheet.get(field).to_string()),
                    ]));
                }
                lines.push(Self::dim(":sheet FIELD VALUE"));
                lines.push(Line::from(""));

                self.rules(&mut lines);
            }
        }

        lines
    }
}

impl Widget for SidebarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(format!(" {} ", self.view.variant.name()))
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(false));

        let inner = block.inner(area);
        block.render(area, buf);

        Paragraph::new(self.lines())
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}
