// HTTP client for the Backend Gateway.
//
// The gateway owns index building and question answering. This client only
// forwards requests; it never interprets an index-build payload beyond
// "parsed as JSON or not".

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::ProxyError;

#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GatewayClient {
    /// Create a client for the gateway at `base_url`.
    ///
    /// `timeout` bounds connecting for every call, the wait for response
    /// headers on asks, and the whole exchange for the JSON calls. Streamed
    /// answers have no total deadline.
    pub fn new(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;
        Ok(GatewayClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /ask?ticker=&question=`. Returns as soon as the response headers
    /// arrive so the caller can relay the body while it is still streaming.
    pub async fn ask(&self, ticker: &str, question: &str) -> Result<reqwest::Response, ProxyError> {
        let url = format!("{}/ask", self.base_url);
        debug!(ticker, "forwarding ask to gateway");
        let request = self
            .http
            .get(url)
            .query(&[("ticker", ticker), ("question", question)])
            .send();
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| {
                ProxyError::UpstreamUnavailable(format!("no response within {:?}", self.timeout))
            })?
            .map_err(|e| ProxyError::UpstreamUnavailable(e.to_string()))
    }

    /// `GET /build-index?ticker=`. Returns the gateway status and its parsed
    /// JSON body.
    pub async fn build_index(&self, ticker: &str) -> Result<(u16, Value), ProxyError> {
        let url = format!("{}/build-index", self.base_url);
        debug!(ticker, "forwarding build-index to gateway");
        let response = self
            .http
            .get(url)
            .query(&[("ticker", ticker)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProxyError::UpstreamUnavailable(e.to_string()))?;
        read_json(response).await
    }

    /// `POST /build-index` seeded with a news feed.
    pub async fn build_index_from_news(
        &self,
        ticker: &str,
        feed: Vec<Value>,
    ) -> Result<(u16, Value), ProxyError> {
        let url = format!("{}/build-index", self.base_url);
        debug!(ticker, articles = feed.len(), "forwarding news-seeded build-index");
        let body = serde_json::json!({ "ticker": ticker, "feed": feed });
        let response = self
            .http
            .post(url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProxyError::UpstreamUnavailable(e.to_string()))?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<(u16, Value), ProxyError> {
    let status = response.status().as_u16();
    let value = response
        .json::<Value>()
        .await
        .map_err(|e| ProxyError::UpstreamUnavailable(format!("invalid gateway body: {e}")))?;
    Ok((status, value))
}
