//! Error types for the chat client.

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::error::UrlError;

/// Chat client error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("backend returned {status} while {context}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// What the client was doing.
        context: String,
    },

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parse error.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// WebSocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(Box<WsError>),

    /// An inbound event carried a payload that does not match its contract.
    #[error("malformed `{event}` payload: {reason}")]
    MalformedPayload {
        /// Wire name of the event.
        event: String,
        /// Why decoding failed.
        reason: String,
    },

    /// Event name not recognized by the client.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// The real-time channel is currently disconnected.
    #[error("real-time channel is not connected")]
    NotConnected,

    /// The real-time channel task has shut down.
    #[error("real-time channel closed")]
    ChannelClosed,

    /// No bearer credential was supplied.
    #[error("no authentication token found")]
    MissingToken,

    /// Feedback targets a message the backend has not confirmed yet.
    #[error("message {0} has no backend identifier yet")]
    UnconfirmedMessage(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<WsError> for ChatError {
    fn from(err: WsError) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl ChatError {
    /// Check if this error is worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout() || err.is_connect(),
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::WebSocket(err) => match err.as_ref() {
                WsError::Url(UrlError::UnableToConnect(_)) => true,
                WsError::Url(_) => false,
                WsError::Http(response) => !response.status().is_client_error(),
                _ => true,
            },
            Self::NotConnected | Self::Io(_) => true,
            _ => false,
        }
    }
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_retryable_by_status() {
        let server = ChatError::Api {
            status: 502,
            context: "listing chats".to_string(),
        };
        let client = ChatError::Api {
            status: 404,
            context: "fetching chat".to_string(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = ChatError::MalformedPayload {
            event: "new_message".to_string(),
            reason: "missing field `id`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed `new_message` payload: missing field `id`"
        );
        assert!(!ChatError::MissingToken.is_retryable());
        assert!(ChatError::NotConnected.is_retryable());
    }

    #[test]
    fn test_socket_url_errors_are_permanent() {
        let bad_url = ChatError::from(WsError::Url(UrlError::UnsupportedUrlScheme));
        let dropped = ChatError::from(WsError::ConnectionClosed);
        assert!(!bad_url.is_retryable());
        assert!(dropped.is_retryable());
    }
}
