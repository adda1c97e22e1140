// Proxy error taxonomy and its JSON rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::warn;

/// Error text for `/api/ask` with a missing ticker or question.
pub const MISSING_ASK_PARAMS: &str = "Missing parameters";
/// Error text for routes that only need a ticker.
pub const MISSING_TICKER: &str = "No ticker provided";
/// Error text returned for any gateway transport failure.
pub const BACKEND_FAILED: &str = "Backend request failed";

#[derive(Debug, Error)]
pub enum ProxyError {
    /// A required query argument was absent or blank. Never retried.
    #[error("{0}")]
    MissingParameter(&'static str),

    /// The gateway could not be reached or returned an unusable body.
    #[error("gateway unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("News API key not configured")]
    NewsNotConfigured,

    /// The news provider answered with an informational notice (usually a
    /// rate limit) instead of a feed.
    #[error("{0}")]
    NewsNotice(String),

    /// Any other failure on the news enrichment path.
    #[error("{0}")]
    News(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            ProxyError::NewsNotice(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamUnavailable(_)
            | ProxyError::NewsNotConfigured
            | ProxyError::News(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `{"error": ...}` body. Transport details stay in
    /// the log.
    pub fn public_message(&self) -> String {
        match self {
            ProxyError::UpstreamUnavailable(_) => BACKEND_FAILED.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        if let ProxyError::UpstreamUnavailable(detail) = &self {
            warn!("Gateway request failed: {detail}");
        }
        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}
