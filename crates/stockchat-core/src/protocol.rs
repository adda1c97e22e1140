// Messages exchanged between the app orchestrator and the terminal UI.
//
// The UI sends `UserCommand`s; the orchestrator answers with `UiUpdate`s.
// Both travel over tokio mpsc channels.

use serde::{Deserialize, Serialize};

use crate::ticker::Ticker;

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry of a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        ChatMessage {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        ChatMessage {
            sender: Sender::Bot,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Screens and reply status
// ---------------------------------------------------------------------------

/// Which screen the workflow is on, as the UI needs to know it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Ticker entry, optionally showing the alert that sent us back here.
    Entry { alert: Option<String> },
    /// Index build in progress.
    Building { ticker: Ticker },
    /// Chat session for a ticker.
    Chatting { ticker: Ticker },
}

/// Status of the bot reply currently shown last in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyStatus {
    #[default]
    Idle,
    Streaming,
    Complete,
    Error,
}

// ---------------------------------------------------------------------------
// Channel messages
// ---------------------------------------------------------------------------

/// Everything the UI needs to draw the chat panel at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatSnapshot {
    /// Finalized transcript, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Text of the in-flight bot reply, drawn after `messages`.
    pub reply: Option<String>,
    pub status: ReplyStatus,
}

/// Updates pushed from the orchestrator to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// The workflow moved to a new screen.
    Screen(Screen),
    /// The transcript changed shape: a turn started or a reply was finalized.
    Chat(ChatSnapshot),
    /// Cumulative text of the in-flight reply. Replaces, never appends.
    ReplyProgress(String),
    /// A user-visible notification (failed build, interrupted reply).
    Alert(String),
}

/// Commands sent from the UI to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Raw ticker text from the entry screen.
    SubmitTicker(String),
    /// Raw question text from the chat input.
    SendQuestion(String),
    /// Leave the chat and return to ticker entry.
    Reset,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_serializes_lowercase_sender() {
        let json = serde_json::to_string(&ChatMessage::user("Hello")).unwrap();
        assert_eq!(json, r#"{"sender":"user","text":"Hello"}"#);
        let back: ChatMessage = serde_json::from_str(r#"{"sender":"bot","text":"Hi"}"#).unwrap();
        assert_eq!(back, ChatMessage::bot("Hi"));
    }

    #[test]
    fn reply_status_defaults_to_idle() {
        assert_eq!(ReplyStatus::default(), ReplyStatus::Idle);
    }
}
