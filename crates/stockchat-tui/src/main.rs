// StockChat terminal client entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Build the research client
// 4. Create mpsc channels
// 5. Spawn app logic task
// 6. Run the TUI until the user quits
// 7. Cleanup on exit

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use stockchat_app::api::{HttpResearchApi, ResearchApi};
use stockchat_app::app;
use stockchat_core::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("StockChat starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!("Config loaded: proxy={}", config.client.proxy_url);

    // 3. Build the research client
    let api: Arc<dyn ResearchApi> = Arc::new(
        HttpResearchApi::from_config(&config).context("failed to build HTTP client")?,
    );

    // 4. Create mpsc channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (build_tx, build_rx) = mpsc::channel(8);
    let (chat_tx, chat_rx) = mpsc::channel(256);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let state = app::AppState::new(api, Some(config.request_timeout()), build_tx, chat_tx);

    // 5. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, build_rx, chat_rx, ui_tx, state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 6. Run the TUI (blocks until the user quits)
    if let Err(e) = stockchat_tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {}", e);
    }

    // 7. Cleanup: wait for the app task to finish (with timeout)
    let _ = tokio::time::timeout(Duration::from_secs(5), app_handle).await;

    info!("StockChat shut down cleanly");
    Ok(())
}

/// Log directory: `./logs`, or the platform data dir when the working
/// directory is not writable.
fn log_dir() -> anyhow::Result<PathBuf> {
    let local = std::env::current_dir()?.join("logs");
    if std::fs::create_dir_all(&local).is_ok() {
        return Ok(local);
    }
    let dirs = directories::ProjectDirs::from("", "", "stockchat")
        .context("no writable log directory")?;
    let fallback = dirs.data_local_dir().join("logs");
    std::fs::create_dir_all(&fallback)
        .with_context(|| format!("failed to create {}", fallback.display()))?;
    Ok(fallback)
}

/// Initialize tracing to log to a file (the terminal belongs to the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_file = std::fs::File::create(log_dir()?.join("stockchat.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stockchat=info,stockchat_tui=info,stockchat_app=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
