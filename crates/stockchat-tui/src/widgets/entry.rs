// Ticker entry screen: title, ticker input, alert line.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::layout::centered;
use crate::ViewState;

pub const TITLE: &str = "AI-Powered Financial Research";

const BOX_WIDTH: u16 = 48;
const BOX_HEIGHT: u16 = 10;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let area = centered(area, BOX_WIDTH, BOX_HEIGHT);

    let input_line = if state.input.is_empty() {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan)),
            Span::styled("e.g. AAPL", Style::default().fg(Color::DarkGray)),
        ])
    } else {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan)),
            Span::styled(
                format!("{}_", state.input),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ])
    };

    let mut lines = vec![
        Line::from(Span::styled(
            TITLE,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Enter a stock ticker to research",
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        input_line,
        Line::from(""),
    ];
    if let Some(alert) = &state.alert {
        lines.push(Line::from(Span::styled(
            alert.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}
