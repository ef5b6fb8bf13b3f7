//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.relay/config.json`) and environment.
//! Environment variables override file values so deployments can keep secrets out of the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default completion endpoint (OpenAI-compatible).
pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.xiaomimimo.com/v1";

/// Default Telegram Bot API root.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Completion provider settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Channel settings (Telegram).
    #[serde(default)]
    pub channels: ChannelsConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Completion provider endpoint and credential.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
    /// OpenAI-compatible base URL, e.g. "https://api.xiaomimimo.com/v1". Overridden by COMPLETION_BASE_URL env.
    pub base_url: Option<String>,
    /// API key sent as a bearer token. Overridden by API_KEY env.
    pub api_key: Option<String>,
}

/// Per-channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramChannelConfig,
}

/// Telegram channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_TOKEN env when set.
    pub bot_token: Option<String>,
    /// Bot API root (default https://api.telegram.org). Overridden by TELEGRAM_API_BASE env.
    pub api_base: Option<String>,
    /// Public URL of this server's /webhook. When set, `serve` registers it on startup and removes it on shutdown.
    pub webhook_url: Option<String>,
}

/// Trimmed, non-empty value or None.
fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Env var `key` when set and non-empty, else the config value (also trimmed).
fn env_or(key: &str, fallback: Option<&str>) -> Option<String> {
    non_empty(std::env::var(key).ok().as_deref()).or_else(|| non_empty(fallback))
}

/// Resolve the completion API key: env API_KEY overrides config.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    env_or("API_KEY", config.completion.api_key.as_deref())
}

/// Resolve the completion base URL: env COMPLETION_BASE_URL, then config, then the default.
pub fn resolve_completion_base_url(config: &Config) -> String {
    env_or("COMPLETION_BASE_URL", config.completion.base_url.as_deref())
        .unwrap_or_else(|| DEFAULT_COMPLETION_BASE_URL.to_string())
}

/// Resolve the Telegram bot token: env TELEGRAM_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Option<String> {
    env_or("TELEGRAM_TOKEN", config.channels.telegram.bot_token.as_deref())
}

/// Resolve the Telegram Bot API root: env TELEGRAM_API_BASE, then config, then the default.
pub fn resolve_telegram_api_base(config: &Config) -> String {
    env_or("TELEGRAM_API_BASE", config.channels.telegram.api_base.as_deref())
        .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RELAY_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".relay").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (or RELAY_CONFIG_PATH). Missing file => default config.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
