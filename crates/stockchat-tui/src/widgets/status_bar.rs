// Status bar widget: app name, current ticker, latest alert.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use stockchat_core::protocol::Screen;

use crate::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [app name] [ticker] [alert]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = vec![Span::styled(
        " StockChat ",
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];

    if let Some(ticker) = state.ticker() {
        spans.push(Span::styled(
            format!(" {ticker} "),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
    }

    // The entry screen shows its own alert under the input.
    if !matches!(state.screen, Screen::Entry { .. }) {
        if let Some(alert) = &state.alert {
            spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
            spans.push(Span::styled(alert.clone(), Style::default().fg(Color::Red)));
        }
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::buffer_text;
    use stockchat_core::ticker::Ticker;

    #[test]
    fn shows_ticker_and_alert_while_chatting() {
        let backend = ratatui::backend::TestBackend::new(80, 1);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState {
            screen: Screen::Chatting {
                ticker: Ticker::parse("TSLA").unwrap(),
            },
            alert: Some("stream interrupted".into()),
            ..ViewState::default()
        };
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("StockChat"));
        assert!(text.contains("TSLA"));
        assert!(text.contains("stream interrupted"));
    }

    #[test]
    fn entry_alert_not_duplicated() {
        let backend = ratatui::backend::TestBackend::new(80, 1);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState {
            alert: Some("Please enter a ticker".into()),
            ..ViewState::default()
        };
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
        assert!(!buffer_text(&terminal).contains("Please enter"));
    }
}
