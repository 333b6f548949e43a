use pollsync_core::EngineConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const ENV_TOKEN: &str = "POLLSYNC_TOKEN";

const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_WS_URL: &str = "ws://localhost:8000/api/ws";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    #[serde(default = "default_vote_window_ms")]
    pub vote_trust_window_ms: u64,
    #[serde(default = "default_like_window_ms")]
    pub like_trust_window_ms: u64,
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}

fn default_vote_window_ms() -> u64 {
    pollsync_core::DEFAULT_VOTE_TRUST_WINDOW.as_millis() as u64
}

fn default_like_window_ms() -> u64 {
    pollsync_core::DEFAULT_LIKE_TRUST_WINDOW.as_millis() as u64
}

fn default_reconnect_backoff_ms() -> u64 {
    pollsync_core::DEFAULT_RECONNECT_BACKOFF.as_millis() as u64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            vote_trust_window_ms: default_vote_window_ms(),
            like_trust_window_ms: default_like_window_ms(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
        }
    }
}

impl Config {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            Self::parse(&raw)?
        } else {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.apply_env(std::env::var(ENV_TOKEN).ok());
        Ok(config)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.auth.token = Some(token);
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            vote_trust_window: Duration::from_millis(self.sync.vote_trust_window_ms),
            like_trust_window: Duration::from_millis(self.sync.like_trust_window_ms),
            reconnect_backoff: Duration::from_millis(self.sync.reconnect_backoff_ms),
        }
    }
}
