// Application orchestrator: owns the workflow and chat session, runs the
// main event loop, and turns network results into UI updates.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use stockchat_core::protocol::{ReplyStatus, UiUpdate, UserCommand};
use stockchat_core::ticker::Ticker;

use crate::api::{ApiError, ResearchApi};
use crate::chat::{stream_turn, ChatEvent, ChatSession, ReplyChange, TurnId, TurnRejected};
use crate::workflow::{WorkflowController, WorkflowError, WorkflowState};

/// Alert shown when a reply fails.
pub const REPLY_FAILED_ALERT: &str = "The answer could not be completed";

/// Result of an index build task.
#[derive(Debug, Clone)]
pub struct BuildEvent {
    pub generation: u64,
    pub ticker: Ticker,
    pub result: Result<Value, ApiError>,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub api: Arc<dyn ResearchApi>,
    pub workflow: WorkflowController,
    /// Present only while chatting.
    pub chat: Option<ChatSession>,
    /// Idle limit between answer chunks, if any.
    pub read_timeout: Option<Duration>,
    /// Incremented for every build spawned. Results from older builds are
    /// discarded in `handle_build_event`.
    pub build_generation: u64,
    /// Highest turn id handed out so far, carried across sessions.
    pub turn_base: TurnId,
    pub build_task: Option<JoinHandle<()>>,
    pub chat_task: Option<JoinHandle<()>>,
    pub build_tx: mpsc::Sender<BuildEvent>,
    pub chat_tx: mpsc::Sender<ChatEvent>,
}

impl AppState {
    pub fn new(
        api: Arc<dyn ResearchApi>,
        read_timeout: Option<Duration>,
        build_tx: mpsc::Sender<BuildEvent>,
        chat_tx: mpsc::Sender<ChatEvent>,
    ) -> Self {
        AppState {
            api,
            workflow: WorkflowController::new(),
            chat: None,
            read_timeout,
            build_generation: 0,
            turn_base: 0,
            build_task: None,
            chat_task: None,
            build_tx,
            chat_tx,
        }
    }

    /// Spawn the index build for the ticker the workflow is building.
    fn start_build(&mut self) {
        let ticker = match self.workflow.state() {
            WorkflowState::Building { ticker } => ticker.clone(),
            _ => return,
        };
        self.build_generation += 1;
        let generation = self.build_generation;
        let api = Arc::clone(&self.api);
        let tx = self.build_tx.clone();

        info!(%ticker, generation, "building index");
        self.build_task = Some(tokio::spawn(async move {
            let result = api.build_index(&ticker).await;
            let _ = tx
                .send(BuildEvent {
                    generation,
                    ticker,
                    result,
                })
                .await;
        }));
    }

    /// Start a turn in the active session and spawn its network half.
    fn start_turn(&mut self, question: &str) -> Result<(), TurnRejected> {
        let Some(session) = self.chat.as_mut() else {
            return Ok(());
        };
        let ticket = session.begin_turn(question)?;
        self.turn_base = ticket.turn;

        let api = Arc::clone(&self.api);
        let ticker = session.ticker().clone();
        let tx = self.chat_tx.clone();
        let read_timeout = self.read_timeout;
        self.chat_task = Some(tokio::spawn(stream_turn(
            api,
            ticker,
            ticket,
            read_timeout,
            tx,
        )));
        Ok(())
    }

    fn open_session(&mut self, ticker: Ticker) {
        let mut session = ChatSession::new(ticker).with_turn_base(self.turn_base);
        if let Some(timeout) = self.read_timeout {
            session = session.with_read_timeout(timeout);
        }
        self.chat = Some(session);
    }

    /// Abort in-flight network work.
    pub fn cancel_tasks(&mut self) {
        if let Some(task) = self.build_task.take() {
            task.abort();
        }
        if let Some(task) = self.chat_task.take() {
            task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Main application event loop.
///
/// Listens on three channels using `tokio::select!`:
/// - `cmd_rx`: commands from the TUI
/// - `build_rx`: index build results from spawned tasks
/// - `chat_rx`: streamed answer events from spawned tasks
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut build_rx: mpsc::Receiver<BuildEvent>,
    mut chat_rx: mpsc::Receiver<ChatEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let mut build_open = true;
    let mut chat_open = true;

    let _ = ui_tx.send(UiUpdate::Screen(state.workflow.screen())).await;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            event = build_rx.recv(), if build_open => {
                match event {
                    Some(event) => handle_build_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("Build channel closed");
                        build_open = false;
                    }
                }
            }

            event = chat_rx.recv(), if chat_open => {
                match event {
                    Some(event) => handle_chat_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("Chat channel closed");
                        chat_open = false;
                    }
                }
            }
        }
    }

    state.cancel_tasks();
    info!("Application event loop exiting");
    Ok(())
}

async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::SubmitTicker(input) => match state.workflow.submit(&input) {
            Ok(_) => {
                let _ = ui_tx.send(UiUpdate::Screen(state.workflow.screen())).await;
                state.start_build();
            }
            Err(WorkflowError::InvalidTicker(err)) => {
                debug!("ticker rejected: {err}");
                let _ = ui_tx.send(UiUpdate::Screen(state.workflow.screen())).await;
            }
            Err(err) => debug!("ignoring ticker submit: {err}"),
        },
        UserCommand::SendQuestion(question) => match state.start_turn(&question) {
            Ok(()) => {
                if let Some(session) = &state.chat {
                    let _ = ui_tx.send(UiUpdate::Chat(session.snapshot())).await;
                }
            }
            Err(rejected) => debug!("question not sent: {rejected}"),
        },
        UserCommand::Reset => {
            info!("returning to ticker entry");
            state.cancel_tasks();
            state.chat = None;
            state.workflow.reset();
            let _ = ui_tx.send(UiUpdate::Screen(state.workflow.screen())).await;
        }
        // Handled by the loop itself.
        UserCommand::Quit => {}
    }
}

async fn handle_build_event(
    state: &mut AppState,
    event: BuildEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    if event.generation != state.build_generation {
        debug!(
            "Discarding stale build result (gen {} != current {})",
            event.generation, state.build_generation
        );
        return;
    }
    state.build_task = None;

    match state.workflow.complete_build(&event.ticker, event.result) {
        Ok(true) => {
            state.open_session(event.ticker);
            let _ = ui_tx.send(UiUpdate::Screen(state.workflow.screen())).await;
            if let Some(session) = &state.chat {
                let _ = ui_tx.send(UiUpdate::Chat(session.snapshot())).await;
            }
        }
        Ok(false) => debug!(ticker = %event.ticker, "build result no longer wanted"),
        Err(err) => {
            let _ = ui_tx.send(UiUpdate::Screen(state.workflow.screen())).await;
            let _ = ui_tx.send(UiUpdate::Alert(err.to_string())).await;
        }
    }
}

async fn handle_chat_event(
    state: &mut AppState,
    event: ChatEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let Some(session) = state.chat.as_mut() else {
        debug!("Received chat event with no session, discarding");
        return;
    };

    let failure = match &event {
        ChatEvent::Failed { error, .. } => Some(error.to_string()),
        _ => None,
    };

    match session.apply_event(event) {
        ReplyChange::Ignored => {}
        ReplyChange::Progress(text) => {
            let _ = ui_tx.send(UiUpdate::ReplyProgress(text)).await;
        }
        ReplyChange::Finalized(status) => {
            state.chat_task = None;
            let _ = ui_tx.send(UiUpdate::Chat(session.snapshot())).await;
            if status == ReplyStatus::Error {
                let detail = failure.unwrap_or_default();
                let _ = ui_tx
                    .send(UiUpdate::Alert(format!("{REPLY_FAILED_ALERT}: {detail}")))
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AskStream;
    use crate::chat::{ERROR_REPLY, GREETING};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::stream;
    use std::sync::Mutex;
    use stockchat_core::protocol::{ChatMessage, ChatSnapshot, Screen};

    /// Fake backend: builds succeed unless the ticker is "FAIL"; every ask
    /// streams the configured chunks or fails with `ask_error`.
    struct FakeApi {
        chunks: Vec<&'static [u8]>,
        ask_error: Option<ApiError>,
        builds: Mutex<Vec<String>>,
        asks: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn new(chunks: Vec<&'static [u8]>) -> Self {
            FakeApi {
                chunks,
                ask_error: None,
                builds: Mutex::new(Vec::new()),
                asks: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ResearchApi for FakeApi {
        async fn build_index(&self, ticker: &Ticker) -> Result<Value, ApiError> {
            self.builds.lock().unwrap().push(ticker.to_string());
            if ticker.as_str() == "FAIL" {
                return Err(ApiError::Status(500));
            }
            Ok(serde_json::json!({ "status": "ok" }))
        }

        async fn ask(&self, _ticker: &Ticker, question: &str) -> Result<AskStream, ApiError> {
            self.asks.lock().unwrap().push(question.to_string());
            if let Some(err) = &self.ask_error {
                return Err(err.clone());
            }
            let items: Vec<Result<Bytes, ApiError>> = self
                .chunks
                .iter()
                .map(|c| Ok(Bytes::from_static(c)))
                .collect();
            Ok(Box::pin(stream::iter(items)))
        }
    }

    struct Harness {
        cmd_tx: mpsc::Sender<UserCommand>,
        ui_rx: mpsc::Receiver<UiUpdate>,
        handle: JoinHandle<anyhow::Result<()>>,
    }

    fn spawn_app(api: Arc<FakeApi>) -> Harness {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (build_tx, build_rx) = mpsc::channel(16);
        let (chat_tx, chat_rx) = mpsc::channel(64);
        let (ui_tx, ui_rx) = mpsc::channel(256);
        let state = AppState::new(api, None, build_tx, chat_tx);
        let handle = tokio::spawn(run(cmd_rx, build_rx, chat_rx, ui_tx, state));
        Harness {
            cmd_tx,
            ui_rx,
            handle,
        }
    }

    impl Harness {
        async fn send(&self, cmd: UserCommand) {
            self.cmd_tx.send(cmd).await.unwrap();
        }

        async fn next(&mut self) -> UiUpdate {
            tokio::time::timeout(Duration::from_secs(5), self.ui_rx.recv())
                .await
                .expect("timed out waiting for UI update")
                .expect("UI channel closed")
        }

        /// Skip updates until one matches `pred`.
        async fn until(&mut self, pred: impl Fn(&UiUpdate) -> bool) -> UiUpdate {
            loop {
                let update = self.next().await;
                if pred(&update) {
                    return update;
                }
            }
        }

        async fn quit(self) {
            self.cmd_tx.send(UserCommand::Quit).await.unwrap();
            self.handle.await.unwrap().unwrap();
        }
    }

    fn aapl() -> Ticker {
        Ticker::parse("AAPL").unwrap()
    }

    fn is_final_chat(update: &UiUpdate) -> bool {
        matches!(update, UiUpdate::Chat(snap) if snap.reply.is_none() && snap.status != ReplyStatus::Idle)
    }

    #[tokio::test]
    async fn starts_on_entry_screen() {
        let mut h = spawn_app(Arc::new(FakeApi::new(vec![])));
        assert_eq!(h.next().await, UiUpdate::Screen(Screen::Entry { alert: None }));
        h.quit().await;
    }

    #[tokio::test]
    async fn ticker_to_chat_flow() {
        let api = Arc::new(FakeApi::new(vec![b"Hel", b"lo!"]));
        let mut h = spawn_app(Arc::clone(&api));
        h.next().await;

        h.send(UserCommand::SubmitTicker("aapl".into())).await;
        assert_eq!(
            h.next().await,
            UiUpdate::Screen(Screen::Building { ticker: aapl() })
        );
        assert_eq!(
            h.next().await,
            UiUpdate::Screen(Screen::Chatting { ticker: aapl() })
        );
        assert_eq!(
            h.next().await,
            UiUpdate::Chat(ChatSnapshot {
                messages: vec![ChatMessage::bot(GREETING)],
                reply: None,
                status: ReplyStatus::Idle,
            })
        );

        h.send(UserCommand::SendQuestion("Hello".into())).await;
        match h.next().await {
            UiUpdate::Chat(snap) => {
                assert_eq!(snap.messages.last(), Some(&ChatMessage::user("Hello")));
                assert_eq!(snap.reply.as_deref(), Some(""));
                assert_eq!(snap.status, ReplyStatus::Streaming);
            }
            other => panic!("expected Chat, got {other:?}"),
        }
        assert_eq!(h.next().await, UiUpdate::ReplyProgress("Hel".into()));
        assert_eq!(h.next().await, UiUpdate::ReplyProgress("Hello!".into()));
        match h.next().await {
            UiUpdate::Chat(snap) => {
                assert_eq!(snap.messages.last(), Some(&ChatMessage::bot("Hello!")));
                assert_eq!(snap.reply, None);
                assert_eq!(snap.status, ReplyStatus::Complete);
            }
            other => panic!("expected Chat, got {other:?}"),
        }

        assert_eq!(api.builds.lock().unwrap().as_slice(), ["AAPL"]);
        assert_eq!(api.asks.lock().unwrap().as_slice(), ["Hello"]);
        h.quit().await;
    }

    #[tokio::test]
    async fn blank_ticker_stays_on_entry_without_request() {
        let api = Arc::new(FakeApi::new(vec![]));
        let mut h = spawn_app(Arc::clone(&api));
        h.next().await;

        h.send(UserCommand::SubmitTicker("   ".into())).await;
        assert_eq!(
            h.next().await,
            UiUpdate::Screen(Screen::Entry {
                alert: Some("Please enter a ticker".into())
            })
        );
        h.quit().await;
        assert!(api.builds.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_build_returns_to_entry_with_alert() {
        let mut h = spawn_app(Arc::new(FakeApi::new(vec![])));
        h.next().await;

        h.send(UserCommand::SubmitTicker("FAIL".into())).await;
        h.next().await; // Building
        match h.next().await {
            UiUpdate::Screen(Screen::Entry { alert: Some(msg) }) => {
                assert!(msg.starts_with("Error processing request"), "{msg}");
            }
            other => panic!("expected Entry with alert, got {other:?}"),
        }
        assert!(matches!(h.next().await, UiUpdate::Alert(_)));
        h.quit().await;
    }

    #[tokio::test]
    async fn ask_failure_shows_error_reply_and_alert() {
        let mut api = FakeApi::new(vec![]);
        api.ask_error = Some(ApiError::Status(500));
        let mut h = spawn_app(Arc::new(api));
        h.next().await;

        h.send(UserCommand::SubmitTicker("AAPL".into())).await;
        h.until(|u| matches!(u, UiUpdate::Chat(_))).await;

        h.send(UserCommand::SendQuestion("Hello".into())).await;
        h.next().await; // turn started
        match h.until(is_final_chat).await {
            UiUpdate::Chat(snap) => {
                assert_eq!(snap.messages.last(), Some(&ChatMessage::bot(ERROR_REPLY)));
                assert_eq!(snap.status, ReplyStatus::Error);
            }
            other => panic!("unexpected {other:?}"),
        }
        match h.next().await {
            UiUpdate::Alert(msg) => assert!(msg.starts_with(REPLY_FAILED_ALERT), "{msg}"),
            other => panic!("expected Alert, got {other:?}"),
        }
        h.quit().await;
    }

    #[tokio::test]
    async fn reset_returns_to_entry_and_new_session_starts_fresh() {
        let mut h = spawn_app(Arc::new(FakeApi::new(vec![b"ok"])));
        h.next().await;

        h.send(UserCommand::SubmitTicker("AAPL".into())).await;
        h.until(|u| matches!(u, UiUpdate::Chat(_))).await;
        h.send(UserCommand::SendQuestion("q".into())).await;
        h.until(is_final_chat).await;

        h.send(UserCommand::Reset).await;
        assert_eq!(h.next().await, UiUpdate::Screen(Screen::Entry { alert: None }));

        h.send(UserCommand::SubmitTicker("MSFT".into())).await;
        match h.until(|u| matches!(u, UiUpdate::Chat(_))).await {
            UiUpdate::Chat(snap) => {
                assert_eq!(snap.messages, vec![ChatMessage::bot(GREETING)]);
            }
            other => panic!("unexpected {other:?}"),
        }
        h.quit().await;
    }

    #[tokio::test]
    async fn stale_events_are_discarded() {
        let (build_tx, _build_rx) = mpsc::channel(4);
        let (chat_tx, _chat_rx) = mpsc::channel(4);
        let (ui_tx, mut ui_rx) = mpsc::channel(16);
        let mut state = AppState::new(Arc::new(FakeApi::new(vec![])), None, build_tx, chat_tx);

        state.workflow.submit("AAPL").unwrap();
        state.build_generation = 2;
        let stale = BuildEvent {
            generation: 1,
            ticker: aapl(),
            result: Ok(Value::Null),
        };
        handle_build_event(&mut state, stale, &ui_tx).await;
        assert!(matches!(state.workflow.state(), WorkflowState::Building { .. }));

        // Chat events with no session are dropped too.
        handle_chat_event(&mut state, ChatEvent::Finished { turn: 1 }, &ui_tx).await;
        assert!(ui_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn question_while_streaming_is_ignored() {
        let (build_tx, _build_rx) = mpsc::channel(4);
        let (chat_tx, _chat_rx) = mpsc::channel(4);
        let (ui_tx, mut ui_rx) = mpsc::channel(16);
        let mut state = AppState::new(Arc::new(FakeApi::new(vec![])), None, build_tx, chat_tx);
        state.open_session(aapl());

        state.chat.as_mut().unwrap().begin_turn("first").unwrap();
        handle_user_command(&mut state, UserCommand::SendQuestion("second".into()), &ui_tx).await;

        assert!(ui_rx.try_recv().is_err());
        assert_eq!(state.chat.as_ref().unwrap().view().len(), 3);
    }

    #[tokio::test]
    async fn closing_command_channel_stops_loop() {
        let h = spawn_app(Arc::new(FakeApi::new(vec![])));
        drop(h.cmd_tx);
        h.handle.await.unwrap().unwrap();
    }
}
