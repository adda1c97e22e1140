// Chat session: transcript ownership and the streaming reply cycle.
//
// A turn appends the user's message, opens a `StreamingReply`, and feeds it
// the ask response body chunk by chunk. The reply lives outside the
// transcript until it is finalized, so nothing can be inserted after it
// while it streams.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use stockchat_core::protocol::{ChatMessage, ChatSnapshot, ReplyStatus};
use stockchat_core::ticker::Ticker;

use crate::api::{ApiError, AskStream, ResearchApi};
use crate::decoder::Utf8StreamDecoder;

/// First message of every session.
pub const GREETING: &str = "Hi there 👋 How can I help you today?";

/// Reply text used when the ask request fails before any body arrives.
pub const ERROR_REPLY: &str = "Sorry, an error occurred.";

/// Identifies one bot turn within a session. Monotonically increasing.
pub type TurnId = u64;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TurnRejected {
    #[error("question is empty")]
    EmptyQuestion,
    #[error("a reply is still streaming")]
    ReplyInFlight,
}

/// Handed out by [`ChatSession::begin_turn`]: what to ask and which turn the
/// resulting chunks belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnTicket {
    pub turn: TurnId,
    /// The trimmed question, as recorded in the transcript.
    pub question: String,
}

/// How a [`ChatSession::send_turn`] call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Rejected(TurnRejected),
    /// The ask request failed; the reply reads [`ERROR_REPLY`].
    FailedBeforeStream(ApiError),
    /// The body broke mid-stream; the partial reply was kept as-is.
    InterruptedMidStream(ApiError),
}

/// Progress of a streamed turn, sent from the network task to the owner of
/// the session.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Chunk { turn: TurnId, bytes: Bytes },
    Finished { turn: TurnId },
    Failed {
        turn: TurnId,
        error: ApiError,
        before_stream: bool,
    },
}

/// What applying a [`ChatEvent`] did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyChange {
    /// The event belonged to no active turn.
    Ignored,
    /// New cumulative reply text.
    Progress(String),
    /// The reply was frozen into the transcript.
    Finalized(ReplyStatus),
}

// ---------------------------------------------------------------------------
// StreamingReply
// ---------------------------------------------------------------------------

/// Accumulator for the one in-flight bot reply.
#[derive(Debug)]
pub struct StreamingReply {
    turn: TurnId,
    decoder: Utf8StreamDecoder,
    text: String,
}

impl StreamingReply {
    fn new(turn: TurnId) -> Self {
        StreamingReply {
            turn,
            decoder: Utf8StreamDecoder::new(),
            text: String::new(),
        }
    }

    pub fn turn(&self) -> TurnId {
        self.turn
    }

    /// Everything decoded so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    fn push(&mut self, bytes: &[u8]) {
        let decoded = self.decoder.decode(bytes);
        self.text.push_str(&decoded);
    }

    fn into_message(mut self) -> ChatMessage {
        let tail = self.decoder.finish();
        self.text.push_str(&tail);
        ChatMessage::bot(self.text)
    }
}

// ---------------------------------------------------------------------------
// ChatSession
// ---------------------------------------------------------------------------

/// Transcript and reply state for one ticker.
#[derive(Debug)]
pub struct ChatSession {
    ticker: Ticker,
    messages: Vec<ChatMessage>,
    active: Option<StreamingReply>,
    status: ReplyStatus,
    last_turn: TurnId,
    read_timeout: Option<Duration>,
}

impl ChatSession {
    pub fn new(ticker: Ticker) -> Self {
        ChatSession {
            ticker,
            messages: vec![ChatMessage::bot(GREETING)],
            active: None,
            status: ReplyStatus::Idle,
            last_turn: 0,
            read_timeout: None,
        }
    }

    /// Treat a gap longer than `timeout` between body chunks as a stream
    /// read error in [`ChatSession::send_turn`].
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Number turn ids after `base`, so events from an earlier session on the
    /// same channel can never match a turn of this one.
    pub fn with_turn_base(mut self, base: TurnId) -> Self {
        self.last_turn = base;
        self
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    /// Id of the most recently started turn, or the base if none started.
    pub fn last_turn(&self) -> TurnId {
        self.last_turn
    }

    /// Finalized messages, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn active_reply(&self) -> Option<&StreamingReply> {
        self.active.as_ref()
    }

    pub fn is_replying(&self) -> bool {
        self.active.is_some()
    }

    pub fn status(&self) -> ReplyStatus {
        self.status
    }

    /// Transcript as displayed: finalized messages, then the in-flight reply.
    pub fn view(&self) -> Vec<ChatMessage> {
        let mut view = self.messages.clone();
        if let Some(reply) = &self.active {
            view.push(ChatMessage::bot(reply.text()));
        }
        view
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            messages: self.messages.clone(),
            reply: self.active.as_ref().map(|r| r.text().to_string()),
            status: self.status,
        }
    }

    /// Start a turn: record the user's message and open the bot reply.
    ///
    /// Blank questions and questions sent while a reply is streaming are
    /// rejected without touching the transcript.
    pub fn begin_turn(&mut self, question: &str) -> Result<TurnTicket, TurnRejected> {
        let question = question.trim();
        if question.is_empty() {
            return Err(TurnRejected::EmptyQuestion);
        }
        if self.active.is_some() {
            return Err(TurnRejected::ReplyInFlight);
        }

        self.last_turn += 1;
        let turn = self.last_turn;
        self.messages.push(ChatMessage::user(question));
        self.active = Some(StreamingReply::new(turn));
        self.status = ReplyStatus::Streaming;
        debug!(ticker = %self.ticker, turn, "turn started");

        Ok(TurnTicket {
            turn,
            question: question.to_string(),
        })
    }

    /// Feed body bytes to the reply of `turn`. Returns the cumulative text,
    /// or `None` if `turn` is not the active turn.
    pub fn apply_chunk(&mut self, turn: TurnId, bytes: &[u8]) -> Option<&str> {
        let reply = self.active.as_mut().filter(|r| r.turn == turn)?;
        reply.push(bytes);
        Some(reply.text())
    }

    /// The body ended normally: freeze the reply as it stands.
    pub fn finish(&mut self, turn: TurnId) -> Option<&ChatMessage> {
        let reply = self.take_active(turn)?;
        self.status = ReplyStatus::Complete;
        self.messages.push(reply.into_message());
        self.messages.last()
    }

    /// The ask request failed before any body arrived: the reply becomes the
    /// fixed error text.
    pub fn fail_before_stream(&mut self, turn: TurnId) -> Option<&ChatMessage> {
        self.take_active(turn)?;
        self.status = ReplyStatus::Error;
        self.messages.push(ChatMessage::bot(ERROR_REPLY));
        self.messages.last()
    }

    /// The body broke mid-stream: keep whatever arrived, without a marker.
    pub fn fail_mid_stream(&mut self, turn: TurnId) -> Option<&ChatMessage> {
        let reply = self.take_active(turn)?;
        self.status = ReplyStatus::Error;
        self.messages.push(reply.into_message());
        self.messages.last()
    }

    fn take_active(&mut self, turn: TurnId) -> Option<StreamingReply> {
        match &self.active {
            Some(reply) if reply.turn == turn => self.active.take(),
            _ => None,
        }
    }

    /// Apply an event produced by [`stream_turn`]. Events for any turn other
    /// than the active one are discarded.
    pub fn apply_event(&mut self, event: ChatEvent) -> ReplyChange {
        match event {
            ChatEvent::Chunk { turn, bytes } => match self.apply_chunk(turn, &bytes) {
                Some(text) => ReplyChange::Progress(text.to_string()),
                None => ReplyChange::Ignored,
            },
            ChatEvent::Finished { turn } => match self.finish(turn) {
                Some(_) => ReplyChange::Finalized(ReplyStatus::Complete),
                None => ReplyChange::Ignored,
            },
            ChatEvent::Failed {
                turn,
                error,
                before_stream,
            } => {
                warn!(ticker = %self.ticker, turn, before_stream, "reply failed: {error}");
                let frozen = if before_stream {
                    self.fail_before_stream(turn)
                } else {
                    self.fail_mid_stream(turn)
                };
                match frozen {
                    Some(_) => ReplyChange::Finalized(ReplyStatus::Error),
                    None => ReplyChange::Ignored,
                }
            }
        }
    }

    /// Run a whole turn inline: ask, stream, finalize.
    pub async fn send_turn<A>(&mut self, api: &A, question: &str) -> TurnOutcome
    where
        A: ResearchApi + ?Sized,
    {
        self.send_turn_with(api, question, |_| {}).await
    }

    /// Like [`ChatSession::send_turn`], calling `on_progress` with the
    /// cumulative reply text after every decoded chunk.
    pub async fn send_turn_with<A, F>(
        &mut self,
        api: &A,
        question: &str,
        mut on_progress: F,
    ) -> TurnOutcome
    where
        A: ResearchApi + ?Sized,
        F: FnMut(&str),
    {
        let ticket = match self.begin_turn(question) {
            Ok(ticket) => ticket,
            Err(rejected) => return TurnOutcome::Rejected(rejected),
        };
        let turn = ticket.turn;

        let mut body = match api.ask(&self.ticker, &ticket.question).await {
            Ok(body) => body,
            Err(error) => {
                warn!(ticker = %self.ticker, turn, "ask failed: {error}");
                self.fail_before_stream(turn);
                return TurnOutcome::FailedBeforeStream(error);
            }
        };

        loop {
            match next_chunk(&mut body, self.read_timeout).await {
                Some(Ok(bytes)) => {
                    if let Some(text) = self.apply_chunk(turn, &bytes) {
                        on_progress(text);
                    }
                }
                Some(Err(error)) => {
                    warn!(ticker = %self.ticker, turn, "reply interrupted: {error}");
                    self.fail_mid_stream(turn);
                    return TurnOutcome::InterruptedMidStream(error);
                }
                None => break,
            }
        }

        self.finish(turn);
        info!(ticker = %self.ticker, turn, "turn complete");
        TurnOutcome::Completed
    }
}

/// Next body chunk, with an optional idle deadline that surfaces as a
/// stream read error.
async fn next_chunk(
    body: &mut AskStream,
    timeout: Option<Duration>,
) -> Option<Result<Bytes, ApiError>> {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, body.next()).await {
            Ok(item) => item,
            Err(_) => Some(Err(ApiError::StreamRead(format!(
                "no data for {}s",
                limit.as_secs()
            )))),
        },
        None => body.next().await,
    }
}

/// Network half of a turn for callers that own the session elsewhere.
///
/// Sends `Chunk` events in arrival order followed by exactly one `Finished`
/// or `Failed`. Stops early if the receiver is dropped.
pub async fn stream_turn(
    api: Arc<dyn ResearchApi>,
    ticker: Ticker,
    ticket: TurnTicket,
    read_timeout: Option<Duration>,
    tx: mpsc::Sender<ChatEvent>,
) {
    let turn = ticket.turn;
    let mut body = match api.ask(&ticker, &ticket.question).await {
        Ok(body) => body,
        Err(error) => {
            let _ = tx
                .send(ChatEvent::Failed {
                    turn,
                    error,
                    before_stream: true,
                })
                .await;
            return;
        }
    };

    loop {
        match next_chunk(&mut body, read_timeout).await {
            Some(Ok(bytes)) => {
                if tx.send(ChatEvent::Chunk { turn, bytes }).await.is_err() {
                    debug!(turn, "chat receiver dropped, abandoning stream");
                    return;
                }
            }
            Some(Err(error)) => {
                let _ = tx
                    .send(ChatEvent::Failed {
                        turn,
                        error,
                        before_stream: false,
                    })
                    .await;
                return;
            }
            None => break,
        }
    }

    let _ = tx.send(ChatEvent::Finished { turn }).await;
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
