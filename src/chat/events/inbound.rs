//! Decoding of inbound event payloads.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::MessageId;
use crate::chat::core::message::Message;
use crate::chat::events::names::EventName;

/// Payload of a `typing` event.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct TypingPayload {
    /// Whether the assistant is the one typing.
    #[serde(default, alias = "isBot")]
    pub is_bot: bool,
}

/// Payload of a `message_chunk` event.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct ChunkPayload {
    /// Fragment to append.
    pub content: String,
}

/// Payload of a `new_message` event: the backend's canonical copy.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct IncomingMessage {
    /// Backend identifier.
    pub id: MessageId,
    /// Full content.
    pub content: String,
    /// `true` when the assistant authored it; absent means user.
    #[serde(default, rename = "isBot", alias = "is_bot")]
    pub is_bot: bool,
}

impl From<IncomingMessage> for Message {
    fn from(incoming: IncomingMessage) -> Self {
        Self {
            id: incoming.id,
            content: incoming.content,
            is_bot: incoming.is_bot,
            feedback: None,
        }
    }
}

/// Payload of an `error` event. The backend shape is not fixed, so the raw
/// value is kept.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorPayload(pub Value);

impl ErrorPayload {
    /// Best-effort human-readable description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match &self.0 {
            Value::String(text) => Some(text),
            Value::Object(map) => ["message", "detail", "error"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str)),
            _ => None,
        }
    }
}

/// A decoded inbound event.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundEvent {
    /// `typing`
    Typing(TypingPayload),
    /// `messages`
    Messages,
    /// `message_chunk`
    MessageChunk(ChunkPayload),
    /// `message_done`
    MessageDone,
    /// `new_message`
    NewMessage(IncomingMessage),
    /// `error`
    Error(ErrorPayload),
    /// `stream_stopped`
    StreamStopped,
}

impl InboundEvent {
    /// Decode the payload of a named event.
    ///
    /// # Errors
    /// Returns [`ChatError::MalformedPayload`] if the payload does not match
    /// the event's contract, or [`ChatError::UnknownEvent`] for outbound names.
    pub fn parse(name: EventName, payload: &Value) -> ChatResult<Self> {
        match name {
            EventName::Typing => decode(name, payload).map(Self::Typing),
            EventName::Messages => Ok(Self::Messages),
            EventName::MessageChunk => decode(name, payload).map(Self::MessageChunk),
            EventName::MessageDone => Ok(Self::MessageDone),
            EventName::NewMessage => decode(name, payload).map(Self::NewMessage),
            EventName::Error => Ok(Self::Error(ErrorPayload(payload.clone()))),
            EventName::StreamStopped => Ok(Self::StreamStopped),
            EventName::Message | EventName::StopStream => {
                Err(ChatError::UnknownEvent(name.to_string()))
            }
        }
    }

    /// Wire name of this event.
    #[must_use]
    pub const fn name(&self) -> EventName {
        match self {
            Self::Typing(_) => EventName::Typing,
            Self::Messages => EventName::Messages,
            Self::MessageChunk(_) => EventName::MessageChunk,
            Self::MessageDone => EventName::MessageDone,
            Self::NewMessage(_) => EventName::NewMessage,
            Self::Error(_) => EventName::Error,
            Self::StreamStopped => EventName::StreamStopped,
        }
    }
}

fn decode<T: DeserializeOwned>(name: EventName, payload: &Value) -> ChatResult<T> {
    T::deserialize(payload).map_err(|err| ChatError::MalformedPayload {
        event: name.to_string(),
        reason: err.to_string(),
    })
}
