//! Configuration for the chat client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::core::errors::{ChatError, ChatResult};

/// Environment variable overriding the REST base URL.
pub const ENV_API_URL: &str = "ENTERPRISEGPT_API_URL";
/// Environment variable overriding the socket URL.
pub const ENV_SOCKET_URL: &str = "ENTERPRISEGPT_SOCKET_URL";
/// Environment variable toggling streaming mode (`1`/`true`/`on`).
pub const ENV_STREAM: &str = "ENTERPRISEGPT_STREAM";
/// Environment variable overriding the chat list page size.
pub const ENV_PAGE_SIZE: &str = "ENTERPRISEGPT_PAGE_SIZE";

/// Top-level configuration for the client.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// REST API settings.
    pub api: ApiConfig,
    /// Real-time channel settings.
    pub socket: SocketConfig,
    /// Streaming settings.
    pub streaming: StreamingConfig,
    /// Session handling settings.
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Build the default configuration and apply environment overrides.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed.
    pub fn from_env() -> ChatResult<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(ENV_API_URL) {
            config.api.base_url = url;
        }
        if let Ok(url) = std::env::var(ENV_SOCKET_URL) {
            config.socket.url = url;
        }
        if let Ok(flag) = std::env::var(ENV_STREAM) {
            config.streaming.enabled = parse_flag(&flag).ok_or_else(|| {
                ChatError::InvalidConfig(format!("{ENV_STREAM} must be a boolean, got `{flag}`"))
            })?;
        }
        if let Ok(size) = std::env::var(ENV_PAGE_SIZE) {
            config.api.page_size = size.parse().map_err(|_| {
                ChatError::InvalidConfig(format!("{ENV_PAGE_SIZE} must be a number, got `{size}`"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        let api = Url::parse(&self.api.base_url)?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(ChatError::InvalidConfig(format!(
                "api.base_url must be http(s), got `{}`",
                api.scheme()
            )));
        }

        let socket = Url::parse(&self.socket.url)?;
        if !matches!(socket.scheme(), "ws" | "wss") {
            return Err(ChatError::InvalidConfig(format!(
                "socket.url must be ws(s), got `{}`",
                socket.scheme()
            )));
        }

        if self.api.page == 0 {
            return Err(ChatError::InvalidConfig("api.page must be > 0".to_string()));
        }

        if self.api.page_size == 0 {
            return Err(ChatError::InvalidConfig(
                "api.page_size must be > 0".to_string(),
            ));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(ChatError::InvalidConfig(
                "api.request_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.socket.reconnect_base_delay_ms == 0 {
            return Err(ChatError::InvalidConfig(
                "socket.reconnect_base_delay_ms must be > 0".to_string(),
            ));
        }

        if self.session.title_max_chars == 0 {
            return Err(ChatError::InvalidConfig(
                "session.title_max_chars must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// REST API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the chat backend.
    pub base_url: String,
    /// Page requested when listing chats.
    pub page: u32,
    /// Number of chats requested per page.
    pub page_size: u32,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            page: 1,
            page_size: 10,
            request_timeout_secs: 30,
        }
    }
}

/// Real-time channel settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SocketConfig {
    /// WebSocket endpoint.
    pub url: String,
    /// Reconnection attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnection attempt; doubles on each retry.
    pub reconnect_base_delay_ms: u64,
}

impl SocketConfig {
    /// Backoff before reconnection attempt `attempt` (1-based).
    #[must_use]
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.reconnect_base_delay_ms.saturating_mul(1_u64 << exponent))
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000".to_string(),
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
        }
    }
}

/// Streaming settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Apply `message_chunk` events as they arrive.
    pub enabled: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Session handling settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Characters of the first message used as a new chat's title.
    pub title_max_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { title_max_chars: 30 }
    }
}
