//! Transcript reconciliation.
//!
//! An assistant reply can reach the client twice: token by token through
//! `message_chunk` events (fast, with a locally assigned id) and as one
//! canonical `new_message` echo carrying the backend id. The reconciler
//! folds both into a single transcript entry. The chunk path never learns
//! the backend id, so the echo is matched on exact content.
//!
//! Known limitation: two identical assistant replies in the same
//! transcript are indistinguishable by content, so an echo may upgrade the
//! older one. A backend-supplied correlation token would remove the
//! ambiguity.

use tracing::{debug, trace, warn};

use crate::chat::core::ids::{LocalIds, MessageId};
use crate::chat::core::message::{Feedback, Message};
use crate::chat::core::notice::Notice;
use crate::chat::events::{ChunkPayload, ErrorPayload, IncomingMessage, InboundEvent, TypingPayload};
use crate::chat::reconciler::state::StreamingState;
use crate::chat::reconciler::transcript::Transcript;

/// Notice text shown when the backend reports an error.
pub const GENERIC_FAILURE: &str = "Something went wrong while generating a response";

/// Owns the transcript and the streaming flags of the active session.
#[derive(Debug)]
pub struct Reconciler {
    transcript: Transcript,
    state: StreamingState,
    streaming_enabled: bool,
    ids: LocalIds,
}

impl Reconciler {
    /// Create an empty reconciler.
    #[must_use]
    pub const fn new(streaming_enabled: bool) -> Self {
        Self {
            transcript: Transcript::new(),
            state: StreamingState::idle(),
            streaming_enabled,
            ids: LocalIds::new(),
        }
    }

    /// Current transcript.
    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Current streaming flags.
    #[must_use]
    pub const fn state(&self) -> &StreamingState {
        &self.state
    }

    /// Whether `message_chunk` events are applied.
    #[must_use]
    pub const fn streaming_enabled(&self) -> bool {
        self.streaming_enabled
    }

    /// Enable or disable chunk processing.
    pub const fn set_streaming(&mut self, enabled: bool) {
        self.streaming_enabled = enabled;
    }

    /// Apply one inbound event. Returns a notice when the event should be
    /// surfaced to the user.
    pub fn apply(&mut self, event: InboundEvent) -> Option<Notice> {
        trace!(event = %event.name(), "applying event");
        match event {
            InboundEvent::Typing(payload) => self.on_typing(&payload),
            InboundEvent::Messages => self.state.is_typing = false,
            InboundEvent::MessageChunk(payload) => self.on_chunk(payload),
            InboundEvent::MessageDone => self.on_done(),
            InboundEvent::NewMessage(message) => self.on_new_message(message),
            InboundEvent::Error(payload) => return Some(Self::on_error(&payload)),
            InboundEvent::StreamStopped => self.on_stream_stopped(),
        }
        None
    }

    fn on_typing(&mut self, payload: &TypingPayload) {
        if !payload.is_bot {
            return;
        }
        self.state.is_typing = true;
        self.state.response_in_flight = true;
        self.state.opened_via_chunk = false;
        self.state.current_chunk.clear();
    }

    fn on_chunk(&mut self, payload: ChunkPayload) {
        if !self.streaming_enabled {
            debug!("streaming disabled, ignoring chunk");
            return;
        }
        self.state.is_typing = false;
        self.state.opened_via_chunk = true;
        self.state.current_chunk.push_str(&payload.content);

        // A chunk always extends a trailing assistant entry, whatever
        // typing or done signals arrived in between.
        if let Some(index) = self.transcript.trailing_assistant() {
            self.transcript.append_content(index, &payload.content);
            return;
        }

        let id = self.ids.next_id();
        self.transcript.push(Message::assistant(id, payload.content));
    }

    fn on_done(&mut self) {
        self.state.is_typing = false;
        self.state.response_in_flight = false;
        self.state.message_done = true;
        self.state.opened_via_chunk = true;
        self.state.current_chunk.clear();
    }

    fn on_new_message(&mut self, incoming: IncomingMessage) {
        self.state.is_typing = false;
        self.state.response_in_flight = false;

        if !incoming.is_bot {
            if self.transcript.contains_id(&incoming.id) {
                trace!(id = %incoming.id, "user message already present");
            } else {
                self.transcript.push(incoming.into());
            }
            return;
        }

        if !self.state.opened_via_chunk {
            if !self.transcript.contains_id(&incoming.id) {
                self.transcript.push(incoming.into());
            }
            return;
        }

        match self.transcript.rposition_assistant_with(&incoming.content) {
            Some(index) => self.upgrade_identity(index, incoming.id),
            None if self.transcript.contains_id(&incoming.id) => {
                trace!(id = %incoming.id, "assistant message already present");
            }
            None => {
                debug!(id = %incoming.id, "no streamed match, appending canonical message");
                self.transcript.push(incoming.into());
            }
        }
    }

    /// Give the streamed entry at `index` its canonical id, unless another
    /// entry already owns that id.
    fn upgrade_identity(&mut self, index: usize, id: MessageId) {
        match self.transcript.position_of(&id) {
            Some(owner) if owner != index => {
                warn!(id = %id, index, owner, "id already used by another entry, keeping local id");
            }
            _ => {
                trace!(id = %id, index, "confirmed streamed message");
                self.transcript.set_id(index, id);
            }
        }
    }

    fn on_error(payload: &ErrorPayload) -> Notice {
        warn!(
            detail = payload.description().unwrap_or("unspecified"),
            "backend reported an error"
        );
        Notice::error(GENERIC_FAILURE)
    }

    fn on_stream_stopped(&mut self) {
        self.state.is_typing = false;
        self.state.response_in_flight = false;
        self.state.message_done = true;
    }

    /// Append the optimistic copy of a message the user just sent.
    pub fn push_user_message(&mut self, content: impl Into<String>) -> MessageId {
        let id = self.ids.next_id();
        self.transcript.push(Message::user(id.clone(), content));
        id
    }

    /// Provisional id for a message that has none yet.
    pub fn next_local_id(&mut self) -> MessageId {
        self.ids.next_id()
    }

    /// Record that a user turn was handed to the channel.
    pub const fn begin_turn(&mut self) {
        self.state.message_done = false;
    }

    /// Record that a turn is expected on a freshly created session.
    pub const fn expect_response(&mut self) {
        self.state.response_in_flight = true;
    }

    /// Record that the user asked to stop the current reply. Streamed
    /// content stays; `stream_stopped` or `message_done` finalize the turn.
    pub const fn request_stop(&mut self) {
        self.state.response_in_flight = false;
    }

    /// Attach feedback to a message. Returns `false` if it is not present.
    pub fn set_feedback(&mut self, id: &MessageId, feedback: Feedback) -> bool {
        self.transcript.set_feedback(id, feedback)
    }

    /// Swap in a loaded transcript and reset the streaming flags.
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.transcript = Transcript::from(messages);
        self.state = StreamingState::idle();
    }

    /// Empty the transcript and reset the streaming flags.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.state = StreamingState::idle();
    }
}
