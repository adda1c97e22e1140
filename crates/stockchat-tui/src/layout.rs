// Screen layout: panel arrangement and sizing.
//
// Every screen shares a status bar and help bar. The chat screen splits the
// body further:
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +------------+-------------------------------------+
// | Sidebar    | Transcript (fill)                   |
// | (24 cols)  |                                     |
// |            +-------------------------------------+
// |            | Input (3 rows)                      |
// +------------+-------------------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Width of the chat sidebar in columns.
pub const SIDEBAR_WIDTH: u16 = 24;

/// Resolved areas shared by all screens.
#[derive(Debug, Clone)]
pub struct AppLayout {
    pub status_bar: Rect,
    /// Everything between the status and help bars.
    pub body: Rect,
    pub help_bar: Rect,
}

/// Resolved areas of the chat screen body.
#[derive(Debug, Clone)]
pub struct ChatLayout {
    pub sidebar: Rect,
    pub transcript: Rect,
    pub input: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(3),    // body
            Constraint::Length(1), // help bar
        ])
        .split(area);

    AppLayout {
        status_bar: vertical[0],
        body: vertical[1],
        help_bar: vertical[2],
    }
}

pub fn chat_layout(body: Rect) -> ChatLayout {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
        .split(body);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(horizontal[1]);

    ChatLayout {
        sidebar: horizontal[0],
        transcript: right[0],
        input: right[1],
    }
}

/// A `width` x `height` rect centered in `area`, clamped to fit.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
