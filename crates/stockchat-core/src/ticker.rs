// Stock ticker symbol: the subject of every downstream request.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest symbol accepted at entry.
pub const MAX_TICKER_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickerError {
    #[error("Please enter a ticker")]
    Empty,

    #[error("ticker is longer than {MAX_TICKER_LEN} characters")]
    TooLong,

    #[error("ticker contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A validated, upper-cased ticker symbol such as `AAPL` or `BRK.B`.
///
/// Only constructed through [`Ticker::parse`], so holding one means the
/// symbol is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Trim, upper-case and validate raw user input.
    pub fn parse(input: &str) -> Result<Self, TickerError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TickerError::Empty);
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-'))
        {
            return Err(TickerError::InvalidCharacter(bad));
        }
        if trimmed.len() > MAX_TICKER_LEN {
            return Err(TickerError::TooLong);
        }
        Ok(Ticker(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Ticker {
    type Error = TickerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ticker::parse(&value)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}
