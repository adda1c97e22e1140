// Building screen: spinner while the research index is built.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::layout::centered;
use crate::ViewState;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Render ticks per spinner frame (~100ms at 30 fps).
const TICKS_PER_FRAME: usize = 3;

pub fn spinner_glyph(tick: usize) -> &'static str {
    SPINNER[(tick / TICKS_PER_FRAME) % SPINNER.len()]
}

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let area = centered(area, 44, 5);
    let ticker = state.ticker().unwrap_or_default();

    let lines = vec![
        Line::from(vec![
            Span::styled(spinner_glyph(state.tick), Style::default().fg(Color::Yellow)),
            Span::raw(" "),
            Span::styled(
                format!("Building Index for {ticker}..."),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Gathering filings and news",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::buffer_text;
    use stockchat_core::protocol::Screen;
    use stockchat_core::ticker::Ticker;

    #[test]
    fn spinner_advances_and_wraps() {
        assert_eq!(spinner_glyph(0), "⠋");
        assert_eq!(spinner_glyph(TICKS_PER_FRAME - 1), "⠋");
        assert_eq!(spinner_glyph(TICKS_PER_FRAME), "⠙");
        assert_eq!(spinner_glyph(TICKS_PER_FRAME * SPINNER.len()), "⠋");
    }

    #[test]
    fn shows_ticker_being_built() {
        let backend = ratatui::backend::TestBackend::new(80, 12);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState {
            screen: Screen::Building {
                ticker: Ticker::parse("AMZN").unwrap(),
            },
            ..ViewState::default()
        };
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
        assert!(buffer_text(&terminal).contains("Building Index for AMZN..."));
    }
}
