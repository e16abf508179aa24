//! Layout calculations for the chat TUI

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// The main layout areas
pub struct AppLayout {
    pub title_area: Rect,
    pub transcript_area: Rect,
    pub sidebar_area: Rect,
    pub status_bar: Rect,
    pub hotkey_bar: Rect,
    pub input_area: Rect,
}

impl AppLayout {
    /// Calculate layout based on terminal size
    pub fn calculate(area: Rect) -> Self {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Title bar
                Constraint::Min(8),    // Main content
                Constraint::Length(1), // Status bar
                Constraint::Length(1), // Hotkey bar
                Constraint::Length(3), // Input area
            ])
            .split(area);

        // Content area: transcript + sidebar
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(main_chunks[1]);

        Self {
            title_area: main_chunks[0],
            transcript_area: content_chunks[0],
            sidebar_area: content_chunks[1],
            status_bar: main_chunks[2],
            hotkey_bar: main_chunks[3],
            input_area: main_chunks[4],
        }
    }
}

/// Calculate fixed-size centered popup
pub fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;

    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
