//! Render orchestration for the chat TUI

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use parley_core::RollResult;

use crate::app::{App, InputMode};
use crate::commands::COMMAND_HELP;
use crate::ui::layout::{centered_rect_fixed, AppLayout};
use crate::ui::widgets::{
    DiceAnimationState, DiceRollWidget, HotkeyBarWidget, InputWidget, IntroWidget,
    SidebarWidget, StatusBarWidget, TranscriptWidget,
};

/// Overlay types
#[derive(Debug, Clone)]
pub enum Overlay {
    Help,
    DiceRoll {
        result: Option<RollResult>,
        purpose: String,
    },
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let layout = AppLayout::calculate(area);
    let view = &app.view;

    render_title_bar(frame, app, layout.title_area);

    if view.show_intro {
        frame.render_widget(
            IntroWidget::new(view.variant.title(), &app.theme),
            layout.transcript_area,
        );
    } else {
        let pending = (app.busy && app.streaming_text.is_none())
            .then(|| view.variant.pending_label());
        let transcript = TranscriptWidget::new(&view.messages, &app.theme)
            .title(view.variant.title())
            .scroll(app.transcript_scroll)
            .streaming(app.streaming_text.as_deref())
            .pending(pending)
            .error(app.inline_error());
        frame.render_widget(transcript, layout.transcript_area);
    }

    frame.render_widget(SidebarWidget::new(view, &app.theme), layout.sidebar_area);

    let status = StatusBarWidget::new(view, app.input_mode, &app.theme)
        .message(app.status_message())
        .busy(app.busy);
    frame.render_widget(status, layout.status_bar);

    frame.render_widget(
        HotkeyBarWidget::new(view.variant, app.input_mode, view.show_intro),
        layout.hotkey_bar,
    );

    render_input(frame, app, layout.input_area);

    if let Some(overlay) = app.overlay() {
        render_overlay(frame, app, overlay, area);
    }
}

/// Render the title bar
fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let view = &app.view;
    let mut title = format!(" {} | {} ", view.variant.title(), view.model);
    if let Some(username) = &view.username {
        title.push_str(&format!("| {username} "));
    }

    let line = Line::from(Span::styled(
        title,
        Style::default()
            .fg(app.theme.foreground)
            .add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the input area
fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let is_active = matches!(app.input_mode, InputMode::Insert | InputMode::Command);
    let is_command = matches!(app.input_mode, InputMode::Command);

    let placeholder = if app.busy {
        app.view.variant.pending_label()
    } else {
        app.view.variant.input_hint(app.view.training_active)
    };

    let input_widget = InputWidget::new(app.input_buffer(), &app.theme)
        .cursor_position(app.cursor_position())
        .active(is_active)
        .command_mode(is_command)
        .placeholder(placeholder);

    frame.render_widget(input_widget, area);
}

/// Render overlay
fn render_overlay(frame: &mut Frame, app: &App, overlay: &Overlay, area: Rect) {
    match overlay {
        Overlay::Help => render_help_overlay(frame, app, area),
        Overlay::DiceRoll { result, purpose } => {
            render_dice_overlay(frame, app, result.as_ref(), purpose, area)
        }
    }
}

fn help_lines(app: &App) -> Vec<Line<'static>> {
    let section = |title: &'static str| {
        Line::from(Span::styled(
            title,
            Style::default().add_modifier(Modifier::UNDERLINED),
        ))
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!(" {} - Help ", app.view.variant.title()),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        section("Input Modes:"),
        Line::from("  i       Enter INSERT mode (type a message)"),
        Line::from("  :       Enter COMMAND mode"),
        Line::from("  Esc     Return to NORMAL mode"),
        Line::from(""),
        section("Navigation (NORMAL mode):"),
        Line::from("  j/k or ↑/↓     Scroll up/down"),
        Line::from("  PgUp/PgDn      Scroll by page"),
        Line::from("  Ctrl+u/d       Scroll by half page"),
        Line::from("  g/G            Jump to top/bottom"),
        Line::from("  Mouse wheel    Scroll transcript"),
        Line::from(""),
    ];

    let variant = app.view.variant;
    if variant.uses_dice() {
        lines.push(section("Dice:"));
        lines.push(Line::from("  1-6     Roll d4, d6, d8, d10, d12, d20"));
        if variant == parley_core::Variant::Solo {
            lines.push(Line::from("  A       Roll 4d6, drop the lowest"));
        }
        lines.push(Line::from("  r       Show/hide rules"));
        lines.push(Line::from(""));
    }

    lines.push(section("Commands:"));
    for (usage, description) in COMMAND_HELP {
        lines.push(Line::from(format!("  :{usage:<18} {description}")));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press Esc or q to close",
        Style::default().add_modifier(Modifier::DIM),
    )));
    lines
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = help_lines(app);
    let height = (help_text.len() as u16).saturating_add(2);
    let popup_area = centered_rect_fixed(72, height, area);

    // Clear the background
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, popup_area);
}

/// Render dice roll overlay
fn render_dice_overlay(
    frame: &mut Frame,
    app: &App,
    result: Option<&RollResult>,
    purpose: &str,
    area: Rect,
) {
    let popup_area = centered_rect_fixed(44, 15, area);

    // Clear the background
    frame.render_widget(Clear, popup_area);

    let animation_state = if result.is_some() {
        DiceAnimationState::Complete
    } else {
        DiceAnimationState::Rolling {
            frame: app.animation_frame,
        }
    };

    let mut dice_widget = DiceRollWidget::new(&app.theme)
        .purpose(purpose)
        .animation_state(animation_state);

    if let Some(r) = result {
        dice_widget = dice_widget.result(r);
    }

    frame.render_widget(dice_widget, popup_area);
}
