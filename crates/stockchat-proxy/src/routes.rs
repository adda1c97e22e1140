// Route handlers for /api/ask, /api/build-index, /api/news and /health.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::{ProxyError, MISSING_ASK_PARAMS, MISSING_TICKER};
use crate::ProxyState;

const DEFAULT_STREAM_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Debug, Default, Deserialize)]
pub struct AskParams {
    pub ticker: Option<String>,
    pub question: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TickerParams {
    pub ticker: Option<String>,
}

/// Treat absent and blank query values the same way.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn relay_status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY)
}

pub async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /api/ask?ticker=&question=`
///
/// Relays the gateway's status and body. The body is handed to the client
/// chunk by chunk as the gateway produces it.
pub async fn ask(
    State(state): State<ProxyState>,
    Query(params): Query<AskParams>,
) -> Result<Response, ProxyError> {
    let (Some(ticker), Some(question)) = (present(params.ticker), present(params.question))
    else {
        return Err(ProxyError::MissingParameter(MISSING_ASK_PARAMS));
    };

    let upstream = state.gateway.ask(ticker.trim(), &question).await?;
    let status = relay_status(upstream.status().as_u16());
    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_STREAM_CONTENT_TYPE)
        .to_string();
    info!(ticker = ticker.trim(), %status, "relaying ask stream");

    let body = Body::from_stream(upstream.bytes_stream());
    Ok((status, [(header::CONTENT_TYPE, content_type)], body).into_response())
}

/// `GET /api/build-index?ticker=`
pub async fn build_index(
    State(state): State<ProxyState>,
    Query(params): Query<TickerParams>,
) -> Result<Response, ProxyError> {
    let ticker = present(params.ticker).ok_or(ProxyError::MissingParameter(MISSING_TICKER))?;
    let (code, body) = state.gateway.build_index(ticker.trim()).await?;
    info!(ticker = ticker.trim(), status = code, "build-index relayed");
    Ok((relay_status(code), Json(body)).into_response())
}

/// `GET /api/news?ticker=`
///
/// Fetches the ticker's news feed and asks the gateway to build its index
/// from it.
pub async fn news(
    State(state): State<ProxyState>,
    Query(params): Query<TickerParams>,
) -> Result<Response, ProxyError> {
    let ticker = present(params.ticker).ok_or(ProxyError::MissingParameter(MISSING_TICKER))?;
    let ticker = ticker.trim();
    let news = state.news.as_ref().ok_or(ProxyError::NewsNotConfigured)?;

    let feed = news.fetch_feed(ticker).await?;
    let articles = feed.len();
    let (code, body) = state
        .gateway
        .build_index_from_news(ticker, feed)
        .await
        .map_err(|e| match e {
            ProxyError::UpstreamUnavailable(detail) => ProxyError::News(detail),
            other => other,
        })?;
    info!(ticker, articles, status = code, "news-seeded build-index relayed");
    Ok((relay_status(code), Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_absent() {
        assert_eq!(present(None), None);
        assert_eq!(present(Some(String::new())), None);
        assert_eq!(present(Some("  ".into())), None);
        assert_eq!(present(Some("AAPL".into())), Some("AAPL".into()));
    }

    #[test]
    fn invalid_status_maps_to_bad_gateway() {
        assert_eq!(relay_status(200), StatusCode::OK);
        assert_eq!(relay_status(503), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(relay_status(42), StatusCode::BAD_GATEWAY);
    }
}
