//! Transcript message model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chat::core::ids::MessageId;

/// Sentiment annotation a user can attach to a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Feedback {
    /// Thumbs up.
    Positive,
    /// Thumbs down.
    Negative,
    /// Cleared or indifferent.
    Neutral,
}

impl Feedback {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
        }
    }

    /// Numeric value expected by the feedback endpoint.
    #[must_use]
    pub const fn score(self) -> i8 {
        match self {
            Self::Positive => 1,
            Self::Negative => -1,
            Self::Neutral => 0,
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feedback {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "POSITIVE" => Ok(Self::Positive),
            "NEGATIVE" => Ok(Self::Negative),
            "NEUTRAL" => Ok(Self::Neutral),
            _ => Err(value.to_string()),
        }
    }
}

/// One entry of a transcript.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Provisional or confirmed identifier.
    pub id: MessageId,
    /// Text content; grows while an assistant reply streams in.
    pub content: String,
    /// `true` for assistant-authored messages.
    #[serde(rename = "isBot", alias = "is_bot", default)]
    pub is_bot: bool,
    /// Optional sentiment annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl Message {
    /// Build a user-authored message.
    #[must_use]
    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            is_bot: false,
            feedback: None,
        }
    }

    /// Build an assistant-authored message.
    #[must_use]
    pub fn assistant(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            is_bot: true,
            feedback: None,
        }
    }
}
