//! Application configuration: file layering plus `APP_*` environment
//! overrides, validated before the server starts.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SESSION_TTL_SECS: u64 = 1800;
const CONFIG_DIR: &str = "config";

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    #[validate(length(min = 1))]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deployment environment name (development, test, production).
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log level filter when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON-formatted logs (production collectors).
    #[serde(default)]
    pub log_json: bool,

    /// How long an unconfirmed checkout session stays retrievable.
    /// Sessions only advisory-check stock, so abandoning one never strands
    /// inventory; the TTL just bounds the replay window.
    #[serde(default = "default_session_ttl")]
    #[validate(range(min = 60, max = 86400))]
    pub session_ttl_secs: u64,

    /// Days after delivery during which a return may be requested.
    #[serde(default = "default_return_window_days")]
    #[validate(range(min = 1, max = 90))]
    pub return_window_days: u32,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_session_ttl() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}
fn default_return_window_days() -> u32 {
    7
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            session_ttl_secs: default_session_ttl(),
            return_window_days: default_return_window_days(),
        }
    }
}

impl AppConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads `config/default.toml`, then `config/<environment>.toml`, then
/// `APP_*` environment variables (e.g. `APP_PORT=9090`).
pub fn load_config() -> Result<AppConfig, ConfigurationError> {
    let environment =
        std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder();
    let default_path = Path::new(CONFIG_DIR).join("default");
    let env_path = Path::new(CONFIG_DIR).join(&environment);
    builder = builder
        .add_source(File::from(default_path).required(false))
        .add_source(File::from(env_path).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"));

    let cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

/// Initializes the tracing subscriber. `RUST_LOG` wins over the configured
/// level; safe to call more than once (later calls are no-ops).
pub fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}
