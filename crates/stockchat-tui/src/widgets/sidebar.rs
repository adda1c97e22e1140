// Chat sidebar: ticker, reply status, shortcuts.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use stockchat_core::protocol::ReplyStatus;

use crate::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let ticker = state.ticker().unwrap_or_default();
    let (status_text, status_color) = status_indicator(state.reply_status);

    let lines = vec![
        Line::from(Span::styled("Researching", Style::default().fg(Color::Gray))),
        Line::from(Span::styled(
            ticker.to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Reply: ", Style::default().fg(Color::Gray)),
            Span::styled(status_text, Style::default().fg(status_color)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Esc for a new ticker",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Stock"));
    frame.render_widget(paragraph, area);
}

/// Return status text and color for the reply status.
pub fn status_indicator(status: ReplyStatus) -> (&'static str, Color) {
    match status {
        ReplyStatus::Idle => ("ready", Color::DarkGray),
        ReplyStatus::Streaming => ("streaming...", Color::Yellow),
        ReplyStatus::Complete => ("complete", Color::Green),
        ReplyStatus::Error => ("error", Color::Red),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::buffer_text;
    use stockchat_core::protocol::Screen;
    use stockchat_core::ticker::Ticker;

    #[test]
    fn status_indicator_values() {
        assert_eq!(status_indicator(ReplyStatus::Idle).0, "ready");
        assert_eq!(status_indicator(ReplyStatus::Streaming).1, Color::Yellow);
        assert_eq!(status_indicator(ReplyStatus::Complete).1, Color::Green);
        assert_eq!(status_indicator(ReplyStatus::Error), ("error", Color::Red));
    }

    #[test]
    fn shows_ticker_and_status() {
        let backend = ratatui::backend::TestBackend::new(24, 10);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState {
            screen: Screen::Chatting {
                ticker: Ticker::parse("GOOG").unwrap(),
            },
            reply_status: ReplyStatus::Streaming,
            ..ViewState::default()
        };
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("GOOG"));
        assert!(text.contains("streaming..."));
    }
}
