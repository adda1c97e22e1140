// Question input box. Shows `…` in the title while a reply streams.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::ViewState;

pub fn send_hint(streaming: bool) -> &'static str {
    if streaming {
        "…"
    } else {
        "Send (Enter)"
    }
}

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let streaming = state.is_streaming();

    let line = if state.input.is_empty() {
        Line::from(Span::styled(
            "Ask a question...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(format!("{}_", state.input))
    };

    // Keep the cursor end of long drafts visible.
    let inner_width = area.width.saturating_sub(2) as usize;
    let typed = state.input.width() + 1;
    let scroll_x = u16::try_from(typed.saturating_sub(inner_width)).unwrap_or(u16::MAX);

    let border = if streaming {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };

    let paragraph = Paragraph::new(line).scroll((0, scroll_x)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(send_hint(streaming)),
    );
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::buffer_text;

    fn draw(state: &ViewState, width: u16) -> String {
        let backend = ratatui::backend::TestBackend::new(width, 3);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), state))
            .unwrap();
        buffer_text(&terminal)
    }

    #[test]
    fn send_hint_values() {
        assert_eq!(send_hint(false), "Send (Enter)");
        assert_eq!(send_hint(true), "…");
    }

    #[test]
    fn placeholder_when_empty() {
        assert!(draw(&ViewState::default(), 40).contains("Ask a question..."));
    }

    #[test]
    fn ellipsis_while_streaming() {
        let state = ViewState {
            reply: Some("partial".into()),
            input: "next one".into(),
            ..ViewState::default()
        };
        let text = draw(&state, 40);
        assert!(text.contains("…"));
        assert!(!text.contains("Send (Enter)"));
        assert!(text.contains("next one_"));
    }

    #[test]
    fn long_draft_scrolls_to_cursor() {
        let state = ViewState {
            input: format!("{}END", "x".repeat(60)),
            ..ViewState::default()
        };
        assert!(draw(&state, 30).contains("END_"));
    }

    #[test]
    fn wide_draft_scrolls_by_cells() {
        let state = ViewState {
            input: format!("{}END", "日".repeat(20)),
            ..ViewState::default()
        };
        assert!(draw(&state, 30).contains("END_"));
    }
}
