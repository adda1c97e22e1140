// Same-origin proxy between the chat client and the Backend Gateway.
//
// Each route validates its query parameters, forwards to the gateway and
// relays the response. The ask route streams the gateway body through
// without buffering it.

pub mod error;
pub mod gateway;
pub mod news;
pub mod routes;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use stockchat_core::config::Config;

use gateway::GatewayClient;
use news::NewsClient;

/// Shared handler state. Cheap to clone: the HTTP clients are
/// reference-counted internally.
#[derive(Clone)]
pub struct ProxyState {
    pub gateway: GatewayClient,
    /// `None` when no news API key is configured.
    pub news: Option<NewsClient>,
}

impl ProxyState {
    pub fn new(gateway: GatewayClient, news: Option<NewsClient>) -> Self {
        ProxyState { gateway, news }
    }

    /// Build the gateway and news clients from the application config.
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let timeout = config.request_timeout();
        let gateway = GatewayClient::new(&config.gateway.base_url, timeout)?;
        let news = match &config.credentials.news_api_key {
            Some(key) if !key.is_empty() => Some(NewsClient::new(
                &config.news.api_url,
                key.clone(),
                timeout,
            )?),
            _ => None,
        };
        Ok(ProxyState::new(gateway, news))
    }
}

/// Assemble the proxy router.
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/ask", get(routes::ask))
        .route("/api/build-index", get(routes::build_index))
        .route("/api/news", get(routes::news))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve the proxy on an already-bound listener until the task is cancelled.
pub async fn serve(listener: TcpListener, state: ProxyState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Proxy listening on {addr}");
    }
    axum::serve(listener, router(state)).await
}
