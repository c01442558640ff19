//! Wire names of real-time channel events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named event carried by the real-time channel.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    /// Somebody (usually the assistant) started composing.
    Typing,
    /// Acknowledgement that the backend received the user's message.
    Messages,
    /// Partial assistant content.
    MessageChunk,
    /// The assistant finished streaming.
    MessageDone,
    /// Canonical copy of a message.
    NewMessage,
    /// Backend-side failure.
    Error,
    /// The backend honored a stop request.
    StreamStopped,
    /// Outbound: user message for a chat.
    Message,
    /// Outbound: ask the backend to stop generating.
    StopStream,
}

impl EventName {
    /// Events the client listens to.
    pub const INBOUND: [Self; 7] = [
        Self::Typing,
        Self::Messages,
        Self::MessageChunk,
        Self::MessageDone,
        Self::NewMessage,
        Self::Error,
        Self::StreamStopped,
    ];

    /// Stable wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::Messages => "messages",
            Self::MessageChunk => "message_chunk",
            Self::MessageDone => "message_done",
            Self::NewMessage => "new_message",
            Self::Error => "error",
            Self::StreamStopped => "stream_stopped",
            Self::Message => "message",
            Self::StopStream => "stop_stream",
        }
    }

    /// Whether the client consumes this event.
    #[must_use]
    pub const fn is_inbound(self) -> bool {
        !matches!(self, Self::Message | Self::StopStream)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "typing" => Ok(Self::Typing),
            "messages" => Ok(Self::Messages),
            "message_chunk" => Ok(Self::MessageChunk),
            "message_done" => Ok(Self::MessageDone),
            "new_message" => Ok(Self::NewMessage),
            "error" => Ok(Self::Error),
            "stream_stopped" => Ok(Self::StreamStopped),
            "message" => Ok(Self::Message),
            "stop_stream" => Ok(Self::StopStream),
            _ => Err(value.to_string()),
        }
    }
}
