// Ticker workflow: Entry -> Building -> Chatting, with failures back to Entry.

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use stockchat_core::protocol::Screen;
use stockchat_core::ticker::{Ticker, TickerError};

use crate::api::{ApiError, ResearchApi};

/// Alert text shown when an index build fails.
pub const BUILD_FAILED_ALERT: &str = "Error processing request";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    /// Waiting for a ticker. `error` holds the alert that sent us back here.
    Entry { error: Option<String> },
    Building { ticker: Ticker },
    Chatting { ticker: Ticker },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    InvalidTicker(#[from] TickerError),

    #[error("{BUILD_FAILED_ALERT}: {0}")]
    BuildFailed(ApiError),

    /// An operation was attempted from the wrong state.
    #[error("not allowed while {0}")]
    WrongState(&'static str),
}

pub struct WorkflowController {
    state: WorkflowState,
}

impl Default for WorkflowController {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowController {
    pub fn new() -> Self {
        WorkflowController {
            state: WorkflowState::Entry { error: None },
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// The ticker carried by `Building` or `Chatting`.
    pub fn ticker(&self) -> Option<&Ticker> {
        match &self.state {
            WorkflowState::Entry { .. } => None,
            WorkflowState::Building { ticker } | WorkflowState::Chatting { ticker } => Some(ticker),
        }
    }

    /// The screen the UI should show for the current state.
    pub fn screen(&self) -> Screen {
        match &self.state {
            WorkflowState::Entry { error } => Screen::Entry {
                alert: error.clone(),
            },
            WorkflowState::Building { ticker } => Screen::Building {
                ticker: ticker.clone(),
            },
            WorkflowState::Chatting { ticker } => Screen::Chatting {
                ticker: ticker.clone(),
            },
        }
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            WorkflowState::Entry { .. } => "entering a ticker",
            WorkflowState::Building { .. } => "building an index",
            WorkflowState::Chatting { .. } => "chatting",
        }
    }

    /// Submit raw ticker input from the entry screen.
    ///
    /// Invalid input keeps us in `Entry` with the reason recorded and issues
    /// nothing. Valid input moves to `Building`.
    pub fn submit(&mut self, input: &str) -> Result<Ticker, WorkflowError> {
        if !matches!(self.state, WorkflowState::Entry { .. }) {
            return Err(WorkflowError::WrongState(self.state_name()));
        }
        match Ticker::parse(input) {
            Ok(ticker) => {
                info!(%ticker, "ticker submitted");
                self.state = WorkflowState::Building {
                    ticker: ticker.clone(),
                };
                Ok(ticker)
            }
            Err(err) => {
                self.state = WorkflowState::Entry {
                    error: Some(err.to_string()),
                };
                Err(err.into())
            }
        }
    }

    /// Enter `Building` from a navigation parameter that may be absent.
    ///
    /// Without a ticker this falls straight back to `Entry` and returns
    /// `false`: no build should be issued.
    pub fn enter_building(&mut self, ticker: Option<Ticker>) -> bool {
        match ticker {
            Some(ticker) => {
                self.state = WorkflowState::Building { ticker };
                true
            }
            None => {
                self.state = WorkflowState::Entry { error: None };
                false
            }
        }
    }

    /// Apply the outcome of the build issued for `ticker`.
    ///
    /// Outcomes for a ticker we are no longer building are ignored and return
    /// `Ok(false)`.
    pub fn complete_build(
        &mut self,
        ticker: &Ticker,
        result: Result<Value, ApiError>,
    ) -> Result<bool, WorkflowError> {
        match &self.state {
            WorkflowState::Building { ticker: current } if current == ticker => {}
            _ => return Ok(false),
        }
        match result {
            Ok(_) => {
                info!(%ticker, "index built, entering chat");
                self.state = WorkflowState::Chatting {
                    ticker: ticker.clone(),
                };
                Ok(true)
            }
            Err(err) => {
                warn!(%ticker, "index build failed: {err}");
                let err = WorkflowError::BuildFailed(err);
                self.state = WorkflowState::Entry {
                    error: Some(err.to_string()),
                };
                Err(err)
            }
        }
    }

    /// Issue the index build for the current `Building` ticker and apply its
    /// outcome. Returns the ticker now being chatted about.
    pub async fn run_build<A>(&mut self, api: &A) -> Result<Ticker, WorkflowError>
    where
        A: ResearchApi + ?Sized,
    {
        let ticker = match &self.state {
            WorkflowState::Building { ticker } => ticker.clone(),
            _ => return Err(WorkflowError::WrongState(self.state_name())),
        };
        let result = api.build_index(&ticker).await;
        self.complete_build(&ticker, result)?;
        Ok(ticker)
    }

    /// Explicit user navigation back to ticker entry.
    pub fn reset(&mut self) {
        self.state = WorkflowState::Entry { error: None };
    }
}
