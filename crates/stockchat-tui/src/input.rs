// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages for the
// orchestrator, or into local ViewState edits (typing, scrolling).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use stockchat_core::protocol::{Screen, UserCommand};

use super::{ViewState, MAX_INPUT_LEN};

/// Lines moved by PageUp/PageDown in the transcript.
const PAGE_LINES: u16 = 10;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// orchestrator, `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Windows reports both press and release.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) {
        return match key_event.code {
            KeyCode::Char('c') => Some(UserCommand::Quit),
            _ => None,
        };
    }

    match view_state.screen {
        Screen::Entry { .. } => handle_entry(key_event, view_state),
        Screen::Building { .. } => match key_event.code {
            KeyCode::Esc => Some(UserCommand::Reset),
            _ => None,
        },
        Screen::Chatting { .. } => handle_chat(key_event, view_state),
    }
}

fn handle_entry(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Enter => Some(UserCommand::SubmitTicker(view_state.input.clone())),
        KeyCode::Char(c) => {
            push_char(view_state, c.to_ascii_uppercase());
            None
        }
        KeyCode::Backspace => {
            view_state.input.pop();
            None
        }
        KeyCode::Esc => {
            view_state.input.clear();
            None
        }
        _ => None,
    }
}

fn handle_chat(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Enter => {
            // Sending is disabled while a reply streams; keep the draft.
            if view_state.is_streaming() || view_state.input.trim().is_empty() {
                return None;
            }
            let question = std::mem::take(&mut view_state.input);
            Some(UserCommand::SendQuestion(question))
        }
        KeyCode::Char(c) => {
            push_char(view_state, c);
            None
        }
        KeyCode::Backspace => {
            view_state.input.pop();
            None
        }
        KeyCode::Esc => Some(UserCommand::Reset),
        KeyCode::Up => {
            scroll_back(view_state, 1);
            None
        }
        KeyCode::Down => {
            scroll_forward(view_state, 1);
            None
        }
        KeyCode::PageUp => {
            scroll_back(view_state, PAGE_LINES);
            None
        }
        KeyCode::PageDown => {
            scroll_forward(view_state, PAGE_LINES);
            None
        }
        KeyCode::End => {
            view_state.scroll_back = 0;
            None
        }
        _ => None,
    }
}

fn push_char(view_state: &mut ViewState, c: char) {
    if !c.is_control() && view_state.input.chars().count() < MAX_INPUT_LEN {
        view_state.input.push(c);
    }
}

// The transcript widget clamps `scroll_back` to the content height.
fn scroll_back(view_state: &mut ViewState, lines: u16) {
    view_state.scroll_back = view_state.scroll_back.saturating_add(lines);
}

fn scroll_forward(view_state: &mut ViewState, lines: u16) {
    view_state.scroll_back = view_state.scroll_back.saturating_sub(lines);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
