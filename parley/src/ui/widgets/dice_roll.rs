//! Animated dice roll display widget

use parley_core::RollResult;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::ui::theme::ChatTheme;

/// Animation state for a dice roll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiceAnimationState {
    Rolling { frame: u8 },
    Complete,
}

/// Widget for displaying a dice roll with animation
pub struct DiceRollWidget<'a> {
    result: Option<&'a RollResult>,
    purpose: &'a str,
    animation_state: DiceAnimationState,
    theme: &'a ChatTheme,
}

impl<'a> DiceRollWidget<'a> {
    pub fn new(theme: &'a ChatTheme) -> Self {
        Self {
            result: None,
            purpose: "",
            animation_state: DiceAnimationState::Complete,
            theme,
        }
    }

    pub fn result(mut self, result: &'a RollResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn purpose(mut self, purpose: &'a str) -> Self {
        self.purpose = purpose;
        self
    }

    pub fn animation_state(mut self, state: DiceAnimationState) -> Self {
        self.animation_state = state;
        self
    }

    fn result_lines(&self, result: &RollResult) -> Vec<Line<'static>> {
        let style = self.theme.roll_result_style(result);
        let natural_20 = result.request.num_dice == 1 && result.request.sides == 20;

        let mut lines = if natural_20 && result.total == 20 {
            vec![
                Line::from(Span::styled("  .--===--.", style)),
                Line::from(Span::styled(" / NAT 20! \\", style)),
                Line::from(Span::styled("|  CRITICAL |", style)),
                Line::from(Span::styled("  '---==---'", style)),
            ]
        } else if natural_20 && result.total == 1 {
            vec![
                Line::from(Span::styled("  .-------.", style)),
                Line::from(Span::styled(" / NAT  1  \\", style)),
                Line::from(Span::styled("|  FUMBLE!  |", style)),
                Line::from(Span::styled("  '-------'", style)),
            ]
        } else {
            vec![
                Line::from("╭─────╮"),
                Line::from(Span::styled(
                    format!("│ {:3} │", result.total),
                    style.add_modifier(Modifier::BOLD),
                )),
                Line::from("╰─────╯"),
            ]
        };

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            result.label(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            result.trace(),
            Style::default().add_modifier(Modifier::DIM),
        )));
        lines
    }
}

impl Widget for DiceRollWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Dice Roll ")
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(true));

        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines: Vec<Line> = Vec::new();

        if !self.purpose.is_empty() {
            lines.push(Line::from(Span::styled(
                self.purpose,
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
        }

        match (self.animation_state, self.result) {
            (DiceAnimationState::Rolling { frame }, _) => {
                let spin_chars = ['|', '/', '-', '\\'];
                let spin = spin_chars[(frame as usize) % 4];

                lines.push(Line::from("╭───╮"));
                lines.push(Line::from(format!("│ {spin} │")));
                lines.push(Line::from("╰───╯"));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Rolling...",
                    Style::default().add_modifier(Modifier::DIM),
                )));
            }
            (DiceAnimationState::Complete, Some(result)) => {
                lines.extend(self.result_lines(result));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Enter or Esc to close",
                    Style::default().add_modifier(Modifier::DIM),
                )));
            }
            (DiceAnimationState::Complete, None) => {
                lines.push(Line::from("No roll to display"));
            }
        }

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{DiceRequest, DieType};

    fn text(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_natural_twenty_banner() {
        let theme = ChatTheme::default();
        let result = RollResult::from_rolls(DieType::D20.request(), vec![20]);
        let lines = text(&DiceRollWidget::new(&theme).result_lines(&result));
        assert!(lines.iter().any(|l| l.contains("NAT 20!")));
        assert!(lines.contains(&"d20 Roll: 20".to_string()));
    }

    #[test]
    fn test_drop_lowest_trace() {
        let theme = ChatTheme::default();
        let result = RollResult::from_rolls(DiceRequest::ABILITY_SCORE, vec![2, 5, 6, 3]);
        let lines = text(&DiceRollWidget::new(&theme).result_lines(&result));
        assert!(lines.contains(&"│  14 │".to_string()));
        assert!(lines.contains(&"Rolls: [2, 3, 5, 6] (Dropped lowest: [2]). Sum: 14".to_string()));
    }

    #[test]
    fn test_d6_six_is_not_a_natural_twenty() {
        let theme = ChatTheme::default();
        let result = RollResult::from_rolls(DieType::D6.request(), vec![6]);
        let lines = text(&DiceRollWidget::new(&theme).result_lines(&result));
        assert!(!lines.iter().any(|l| l.contains("NAT")));
    }
}
