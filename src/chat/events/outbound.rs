//! Events the client emits on the real-time channel.

use serde::Serialize;

use crate::chat::core::errors::ChatResult;
use crate::chat::core::ids::ChatId;
use crate::chat::events::names::EventName;

/// Outbound event. Serializes to the wire envelope `{"type": <name>, ...}`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Send a user message to a chat.
    #[serde(rename = "message")]
    SendMessage {
        /// Target chat.
        chat_id: ChatId,
        /// Text typed by the user.
        message: String,
    },
    /// Ask the backend to stop generating for a chat.
    StopStream {
        /// Target chat.
        chat_id: ChatId,
    },
}

impl OutboundEvent {
    /// Wire name of this event.
    #[must_use]
    pub const fn name(&self) -> EventName {
        match self {
            Self::SendMessage { .. } => EventName::Message,
            Self::StopStream { .. } => EventName::StopStream,
        }
    }

    /// Target chat of this event.
    #[must_use]
    pub const fn chat_id(&self) -> &ChatId {
        match self {
            Self::SendMessage { chat_id, .. } | Self::StopStream { chat_id } => chat_id,
        }
    }

    /// Full wire frame.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_frame(&self) -> ChatResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
