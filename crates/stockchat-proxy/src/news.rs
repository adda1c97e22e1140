// News-sentiment provider client for the news-seeded index build.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ProxyError;

#[derive(Clone)]
pub struct NewsClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl NewsClient {
    pub fn new(api_url: &str, api_key: String, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(NewsClient {
            http,
            api_url: api_url.to_string(),
            api_key,
        })
    }

    /// Fetch the relevance-sorted news feed for `ticker`.
    pub async fn fetch_feed(&self, ticker: &str) -> Result<Vec<Value>, ProxyError> {
        let response = self
            .http
            .get(&self.api_url)
            .query(&[
                ("function", "NEWS_SENTIMENT"),
                ("tickers", ticker),
                ("apikey", self.api_key.as_str()),
                ("sort", "RELEVANCE"),
            ])
            .send()
            .await
            .map_err(|e| ProxyError::News(format!("news request failed: {e}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProxyError::News(format!("invalid news response: {e}")))?;

        let feed = extract_feed(body)?;
        debug!(ticker, articles = feed.len(), "fetched news feed");
        Ok(feed)
    }
}

/// Pull the `feed` array out of a provider response.
///
/// The provider reports rate limits and bad keys with a 200 and an
/// `Information` or `Note` field instead of a feed.
pub(crate) fn extract_feed(body: Value) -> Result<Vec<Value>, ProxyError> {
    for key in ["Information", "Note", "Error Message"] {
        if let Some(notice) = body.get(key).and_then(Value::as_str) {
            warn!("News provider notice: {notice}");
            return Err(ProxyError::NewsNotice(notice.to_string()));
        }
    }
    match body {
        Value::Object(mut map) => match map.remove("feed") {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(ProxyError::News("news feed is not an array".into())),
            None => Ok(Vec::new()),
        },
        _ => Err(ProxyError::News("news response is not an object".into())),
    }
}
