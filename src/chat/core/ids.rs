//! Identifier types for chats and messages.
//!
//! Backend identifiers are opaque: the REST API and the socket may encode
//! them as JSON strings or numbers, so both forms are accepted and kept as
//! text. Messages created locally before the backend confirms them carry a
//! provisional millisecond timestamp instead.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire form of an opaque identifier.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl RawId {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Signed(value) => value.to_string(),
            Self::Unsigned(value) => value.to_string(),
        }
    }
}

/// Declare an opaque string identifier with a consistent API.
macro_rules! define_opaque_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier issued by the backend.
            #[inline]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier text.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into_text()))
            }
        }
    };
}

define_opaque_id!(
    /// Identifier of a chat session, assigned by the backend.
    ChatId
);

/// Identifier of a transcript message.
///
/// `Local` ids are provisional and only unique within one reconciler;
/// `Remote` ids come from the backend and are what feedback and history
/// reloads refer to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Provisional id (milliseconds since the Unix epoch).
    Local(i64),
    /// Backend-confirmed id.
    Remote(String),
}

impl MessageId {
    /// Build a confirmed id.
    #[must_use]
    pub fn remote(value: impl Into<String>) -> Self {
        Self::Remote(value.into())
    }

    /// Whether the backend has confirmed this id.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(value) => write!(f, "{value}"),
            Self::Remote(value) => f.write_str(value),
        }
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Local(value) => serializer.serialize_i64(*value),
            Self::Remote(value) => serializer.serialize_str(value),
        }
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawId::deserialize(deserializer).map(|raw| Self::Remote(raw.into_text()))
    }
}

/// Source of provisional message ids.
///
/// Ids are wall-clock milliseconds, bumped when two are requested within
/// the same millisecond so they stay unique and increasing.
#[derive(Debug, Default)]
pub struct LocalIds {
    last: i64,
}

impl LocalIds {
    /// Create a generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Next provisional id.
    pub fn next_id(&mut self) -> MessageId {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last + 1);
        MessageId::Local(self.last)
    }
}
