// Terminal UI: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors what the orchestrator reports. The
// orchestrator pushes `UiUpdate` messages over an mpsc channel; the TUI
// applies them to `ViewState` and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use stockchat_core::protocol::{ChatMessage, ReplyStatus, Screen, UiUpdate, UserCommand};

use layout::{build_layout, chat_layout};

/// Longest text the input box accepts.
pub const MAX_INPUT_LEN: usize = 500;

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state that mirrors the orchestrator's for rendering.
pub struct ViewState {
    pub screen: Screen,
    /// Finalized transcript, oldest first.
    pub messages: Vec<ChatMessage>,
    /// In-flight bot reply, drawn after `messages`.
    pub reply: Option<String>,
    pub reply_status: ReplyStatus,
    /// Text being typed: the ticker on the entry screen, the question in chat.
    pub input: String,
    /// Latest notification. Shown in the status bar until the screen changes.
    pub alert: Option<String>,
    /// Lines scrolled up from the bottom of the transcript.
    pub scroll_back: u16,
    /// Render ticks elapsed; drives the spinner.
    pub tick: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            screen: Screen::Entry { alert: None },
            messages: Vec::new(),
            reply: None,
            reply_status: ReplyStatus::Idle,
            input: String::new(),
            alert: None,
            scroll_back: 0,
            tick: 0,
        }
    }
}

impl ViewState {
    pub fn is_streaming(&self) -> bool {
        self.reply.is_some()
    }

    /// Ticker of the building or chatting screen.
    pub fn ticker(&self) -> Option<&str> {
        match &self.screen {
            Screen::Entry { .. } => None,
            Screen::Building { ticker } | Screen::Chatting { ticker } => Some(ticker.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Screen(screen) => {
            if std::mem::discriminant(&screen) != std::mem::discriminant(&state.screen) {
                state.input.clear();
                state.scroll_back = 0;
            }
            match &screen {
                Screen::Entry { alert } => {
                    state.alert = alert.clone();
                    state.messages.clear();
                    state.reply = None;
                    state.reply_status = ReplyStatus::Idle;
                }
                _ => state.alert = None,
            }
            state.screen = screen;
        }
        UiUpdate::Chat(snapshot) => {
            state.messages = snapshot.messages;
            state.reply = snapshot.reply;
            state.reply_status = snapshot.status;
            state.scroll_back = 0;
        }
        UiUpdate::ReplyProgress(text) => {
            if state.reply.is_some() {
                state.reply = Some(text);
            } else {
                debug!("progress with no reply in flight, ignoring");
            }
        }
        UiUpdate::Alert(message) => {
            state.alert = Some(message);
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    match state.screen {
        Screen::Entry { .. } => widgets::entry::render(frame, layout.body, state),
        Screen::Building { .. } => widgets::building::render(frame, layout.body, state),
        Screen::Chatting { .. } => {
            let chat = chat_layout(layout.body);
            widgets::sidebar::render(frame, chat.sidebar, state);
            widgets::transcript::render(frame, chat.transcript, state);
            widgets::input_box::render(frame, chat.input, state);
        }
    }
    render_help_bar(frame, layout.help_bar, state);
}

fn help_text(screen: &Screen) -> &'static str {
    match screen {
        Screen::Entry { .. } => " Enter:Research | Ctrl+C:Quit",
        Screen::Building { .. } => " Esc:Cancel | Ctrl+C:Quit",
        Screen::Chatting { .. } => {
            " Enter:Send | Up/Down:Scroll | End:Latest | Esc:New ticker | Ctrl+C:Quit"
        }
    }
}

fn render_help_bar(frame: &mut Frame, area: ratatui::layout::Rect, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        help_text(&state.screen),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (raw mode, alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => apply_ui_update(&mut view_state, update),
                    // Orchestrator is gone.
                    None => break Ok(()),
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("terminal input error: {e}");
                        break Err(e.into());
                    }
                    None => break Ok(()),
                }
            }

            _ = render_tick.tick() => {
                view_state.tick = view_state.tick.wrapping_add(1);
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(e.into());
                }
            }
        }
    };

    ratatui::restore();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
