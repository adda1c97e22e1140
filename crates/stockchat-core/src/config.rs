// Configuration loading and parsing (stockchat.toml, credentials.toml).

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding `gateway.base_url`.
pub const ENV_GATEWAY_URL: &str = "STOCKCHAT_GATEWAY_URL";
/// Environment variable overriding `client.proxy_url`.
pub const ENV_PROXY_URL: &str = "STOCKCHAT_PROXY_URL";
/// Environment variable overriding `news_api_key` from credentials.toml.
pub const ENV_NEWS_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub proxy: ProxyConfig,
    pub client: ClientConfig,
    pub news: NewsConfig,
    pub credentials: CredentialsConfig,
}

impl Config {
    /// Timeout applied to every outbound HTTP request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.request_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// stockchat.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire stockchat.toml file.
#[derive(Debug, Clone, Deserialize)]
struct StockchatFile {
    gateway: GatewayConfig,
    proxy: ProxyConfig,
    client: ClientConfig,
    news: NewsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the Backend Gateway, e.g. `http://localhost:8000`.
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub listen_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the proxy the terminal client talks to.
    pub proxy_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsConfig {
    pub api_url: String,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub news_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/stockchat.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults or read the environment; `load_config()` does both.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- stockchat.toml (required) ---
    let main_path = config_dir.join("stockchat.toml");
    let main_text = read_file(&main_path)?;
    let file: StockchatFile = toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
        path: main_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        gateway: file.gateway,
        proxy: file.proxy,
        client: file.client,
        news: file.news,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                tracing::debug!("copied default config {}", target.display());
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying defaults first and applying environment overrides.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    let mut config = load_config_from(&cwd)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Overlay values from the environment. `lookup` is injected so tests don't
/// touch the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty(ENV_GATEWAY_URL) {
        config.gateway.base_url = url;
    }
    if let Some(url) = non_empty(ENV_PROXY_URL) {
        config.client.proxy_url = url;
    }
    if let Some(key) = non_empty(ENV_NEWS_API_KEY) {
        config.credentials.news_api_key = Some(key);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let url_fields: &[(&str, &str)] = &[
        ("gateway.base_url", &config.gateway.base_url),
        ("client.proxy_url", &config.client.proxy_url),
        ("news.api_url", &config.news.api_url),
    ];
    for (name, val) in url_fields {
        if !(val.starts_with("http://") || val.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be an http(s) URL, got {val:?}"),
            });
        }
    }

    if config.gateway.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "gateway.request_timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.proxy.listen_addr.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::ValidationError {
            field: "proxy.listen_addr".into(),
            message: format!(
                "must be a socket address like 127.0.0.1:3000, got {:?}",
                config.proxy.listen_addr
            ),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
