// Client for the proxy's HTTP surface.
//
// The workflow and chat session only see the `ResearchApi` trait, so tests
// can drive them with scripted responses instead of a live proxy.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use stockchat_core::config::Config;
use stockchat_core::ticker::Ticker;

/// Body of an ask response, yielded chunk by chunk as it arrives.
pub type AskStream = Pin<Box<dyn Stream<Item = Result<Bytes, ApiError>> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never got a response (refused, DNS, timeout).
    #[error("network error: {0}")]
    Transport(String),

    /// The proxy answered with a non-success status.
    #[error("server returned status {0}")]
    Status(u16),

    #[error("invalid response body: {0}")]
    InvalidBody(String),

    /// The body stream broke after the response started.
    #[error("stream interrupted: {0}")]
    StreamRead(String),
}

#[async_trait]
pub trait ResearchApi: Send + Sync {
    /// Ask the backend to build the research index for `ticker`.
    async fn build_index(&self, ticker: &Ticker) -> Result<Value, ApiError>;

    /// Ask a question. Resolves once response headers arrive; the answer is
    /// read from the returned stream.
    async fn ask(&self, ticker: &Ticker, question: &str) -> Result<AskStream, ApiError>;
}

// ---------------------------------------------------------------------------
// HttpResearchApi
// ---------------------------------------------------------------------------

/// `ResearchApi` over HTTP against the proxy.
pub struct HttpResearchApi {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpResearchApi {
    pub fn new(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;
        Ok(HttpResearchApi {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        Self::new(&config.client.proxy_url, config.request_timeout())
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

#[async_trait]
impl ResearchApi for HttpResearchApi {
    async fn build_index(&self, ticker: &Ticker) -> Result<Value, ApiError> {
        let response = self
            .http
            .get(format!("{}/api/build-index", self.base_url))
            .query(&[("ticker", ticker.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::InvalidBody(e.to_string()))
    }

    async fn ask(&self, ticker: &Ticker, question: &str) -> Result<AskStream, ApiError> {
        // Only the header phase is bounded here; the body has its own read
        // timeout in the chat session.
        let request = self
            .http
            .get(format!("{}/api/ask", self.base_url))
            .query(&[("ticker", ticker.as_str()), ("question", question)])
            .send();
        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ApiError::Transport(format!("no response within {:?}", self.timeout)))?
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        debug!(%ticker, "ask stream opened");

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ApiError::StreamRead(e.to_string())));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_messages() {
        assert_eq!(ApiError::Status(500).to_string(), "server returned status 500");
        assert_eq!(
            ApiError::StreamRead("reset".into()).to_string(),
            "stream interrupted: reset"
        );
    }

    #[tokio::test]
    async fn unreachable_proxy_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = HttpResearchApi::new(&format!("http://{addr}/"), Duration::from_secs(2)).unwrap();
        let ticker = Ticker::parse("AAPL").unwrap();
        assert!(matches!(
            api.build_index(&ticker).await,
            Err(ApiError::Transport(_))
        ));
        assert!(matches!(
            api.ask(&ticker, "hi").await,
            Err(ApiError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn silent_proxy_times_out_waiting_for_headers() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and hold them open without ever answering.
        let holder = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let api = HttpResearchApi::new(&format!("http://{addr}"), Duration::from_millis(300)).unwrap();
        let ticker = Ticker::parse("AAPL").unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), api.ask(&ticker, "hi"))
            .await
            .expect("ask should give up on its own");
        assert!(matches!(result, Err(ApiError::Transport(_))));

        holder.abort();
    }
}
