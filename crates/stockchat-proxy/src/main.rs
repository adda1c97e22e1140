// Proxy entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr)
// 2. Load config
// 3. Build gateway/news clients
// 4. Bind and serve until Ctrl+C

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use stockchat_core::config;
use stockchat_proxy::ProxyState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: gateway={}, listen={}",
        config.gateway.base_url, config.proxy.listen_addr
    );

    // 3. Build clients
    let state = ProxyState::from_config(&config).context("failed to build HTTP clients")?;
    if state.news.is_none() {
        warn!("No news API key configured; /api/news will return errors");
    }

    // 4. Bind and serve
    let listener = TcpListener::bind(&config.proxy.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.proxy.listen_addr))?;

    tokio::select! {
        result = stockchat_proxy::serve(listener, state) => {
            result.context("proxy server error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down");
        }
    }

    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stockchat_proxy=info,tower_http=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
