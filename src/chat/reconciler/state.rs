//! Streaming flags for the turn in progress.

use serde::Serialize;

/// Flags describing where the current assistant turn stands.
///
/// Owned by the reconciler and exposed read-only to the presentation side.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct StreamingState {
    /// The assistant is composing and nothing has been streamed yet.
    pub is_typing: bool,
    /// A user turn is waiting for its terminal event; drives the stop button.
    pub response_in_flight: bool,
    /// The last user turn received `message_done` or `stream_stopped`.
    pub message_done: bool,
    /// The current assistant turn was already materialized through chunks
    /// or closed by `message_done`, so a canonical echo must be matched
    /// against existing content instead of appended.
    pub opened_via_chunk: bool,
    /// Text streamed so far for the turn in progress.
    pub current_chunk: String,
}

impl StreamingState {
    /// Idle state: no turn in progress.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            is_typing: false,
            response_in_flight: false,
            message_done: true,
            opened_via_chunk: false,
            current_chunk: String::new(),
        }
    }
}

impl Default for StreamingState {
    fn default() -> Self {
        Self::idle()
    }
}
