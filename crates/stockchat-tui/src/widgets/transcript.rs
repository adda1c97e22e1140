// Chat transcript: user messages right-aligned, bot messages left.
//
// Text is wrapped here with `textwrap` rather than by `Paragraph` so the total
// line count is known and the view can stick to the bottom while a reply
// streams.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use stockchat_core::protocol::{ChatMessage, ReplyStatus, Sender};

use crate::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    let mut lines: Vec<Line<'static>> = Vec::new();
    for message in &state.messages {
        push_message(&mut lines, message, inner_width, Color::Reset);
    }
    if let Some(reply) = &state.reply {
        let text = if reply.is_empty() { "…" } else { reply.as_str() };
        push_message(&mut lines, &ChatMessage::bot(text), inner_width, Color::Yellow);
    }

    let max_scroll = lines.len().saturating_sub(inner_height);
    let top = max_scroll.saturating_sub(state.scroll_back as usize);
    let visible: Vec<Line<'static>> = lines.into_iter().skip(top).take(inner_height).collect();

    let border = match state.reply_status {
        ReplyStatus::Streaming => Style::default().fg(Color::Yellow),
        ReplyStatus::Error => Style::default().fg(Color::Red),
        _ => Style::default(),
    };

    let paragraph = Paragraph::new(visible).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title("Chat"),
    );
    frame.render_widget(paragraph, area);
}

/// Append one message: a sender label, its wrapped text, then a blank line.
fn push_message(lines: &mut Vec<Line<'static>>, message: &ChatMessage, width: usize, bot_color: Color) {
    let (label, style, alignment) = match message.sender {
        Sender::User => ("You", Style::default().fg(Color::Cyan), Alignment::Right),
        Sender::Bot => ("Bot", Style::default().fg(bot_color), Alignment::Left),
    };
    let text_width = width.saturating_sub(2).max(1);

    lines.push(
        Line::from(Span::styled(
            label,
            style.add_modifier(Modifier::BOLD),
        ))
        .alignment(alignment),
    );
    for row in wrap_text(&message.text, text_width) {
        lines.push(Line::from(Span::styled(row, style)).alignment(alignment));
    }
    lines.push(Line::from(""));
}

/// Word wrap to `width` terminal cells. Words wider than a row are split and
/// explicit newlines are kept.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    textwrap::wrap(text, width.max(1))
        .into_iter()
        .map(|row| row.into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::buffer_text;

    #[test]
    fn wrap_short_text_is_one_row() {
        assert_eq!(wrap_text("Hello!", 20), vec!["Hello!"]);
    }

    #[test]
    fn wrap_breaks_on_words() {
        assert_eq!(
            wrap_text("Revenue grew six percent", 12),
            vec!["Revenue grew", "six percent"]
        );
    }

    #[test]
    fn wrap_splits_long_words() {
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_keeps_newlines() {
        assert_eq!(wrap_text("é\n\nab", 4), vec!["é", "", "ab"]);
    }

    #[test]
    fn wrap_counts_wide_chars_as_two_cells() {
        let rows = wrap_text("日本日本日本", 4);
        assert_eq!(rows, vec!["日本", "日本", "日本"]);
        for row in &rows {
            assert!(Line::from(row.as_str()).width() <= 4, "row {row:?}");
        }
    }

    #[test]
    fn wrap_emoji_fits_width() {
        for row in wrap_text("Hello 👋 I can help you research this stock", 8) {
            assert!(Line::from(row.as_str()).width() <= 8, "row {row:?}");
        }
    }

    #[test]
    fn wrap_empty_text() {
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    fn draw(state: &ViewState, width: u16, height: u16) -> String {
        let backend = ratatui::backend::TestBackend::new(width, height);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), state))
            .unwrap();
        buffer_text(&terminal)
    }

    #[test]
    fn renders_messages_and_streaming_reply() {
        let state = ViewState {
            messages: vec![ChatMessage::bot("Hi there"), ChatMessage::user("Hello")],
            reply: Some("Hel".into()),
            reply_status: ReplyStatus::Streaming,
            ..ViewState::default()
        };
        let text = draw(&state, 60, 20);
        assert!(text.contains("Hi there"));
        assert!(text.contains("Hello"));
        assert!(text.contains("Hel"));
        assert!(text.contains("You"));
    }

    #[test]
    fn empty_reply_shows_placeholder() {
        let state = ViewState {
            messages: vec![ChatMessage::user("Hello")],
            reply: Some(String::new()),
            reply_status: ReplyStatus::Streaming,
            ..ViewState::default()
        };
        assert!(draw(&state, 40, 12).contains("…"));
    }

    #[test]
    fn sticks_to_bottom_when_overflowing() {
        let messages = (0..30)
            .map(|i| ChatMessage::bot(format!("message {i}")))
            .collect();
        let state = ViewState {
            messages,
            reply: Some("latest tokens".into()),
            reply_status: ReplyStatus::Streaming,
            ..ViewState::default()
        };
        let text = draw(&state, 40, 10);
        assert!(text.contains("latest tokens"));
        assert!(!text.contains("message 0 "));
    }

    #[test]
    fn scroll_back_reveals_history() {
        let messages = (0..30)
            .map(|i| ChatMessage::bot(format!("message {i}")))
            .collect();
        let state = ViewState {
            messages,
            scroll_back: u16::MAX,
            ..ViewState::default()
        };
        let text = draw(&state, 40, 10);
        assert!(text.contains("message 0 "));
    }

    #[test]
    fn huge_transcript_still_sticks_to_bottom() {
        let messages = (0..25_000)
            .map(|i| ChatMessage::bot(format!("m{i}")))
            .collect();
        let state = ViewState {
            messages,
            scroll_back: 0,
            ..ViewState::default()
        };
        let text = draw(&state, 40, 10);
        assert!(text.contains("m24999"));
    }
}
