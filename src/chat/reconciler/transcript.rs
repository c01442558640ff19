//! Ordered message list for one chat session.

use serde::Serialize;

use crate::chat::core::ids::MessageId;
use crate::chat::core::message::{Feedback, Message};

/// Append-ordered sequence of messages.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Empty transcript.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Messages in display order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript holds no message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Last message, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Index of the last entry when it is an assistant message.
    #[must_use]
    pub fn trailing_assistant(&self) -> Option<usize> {
        self.messages
            .last()
            .filter(|message| message.is_bot)
            .map(|_| self.messages.len() - 1)
    }

    /// Whether some entry carries `id`.
    #[must_use]
    pub fn contains_id(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|message| &message.id == id)
    }

    /// Index of the entry carrying `id`.
    #[must_use]
    pub fn position_of(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|message| &message.id == id)
    }

    /// Index of the most recent assistant entry whose content is exactly
    /// `content`.
    #[must_use]
    pub fn rposition_assistant_with(&self, content: &str) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|message| message.is_bot && message.content == content)
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append `fragment` to the content of the entry at `index`.
    pub(crate) fn append_content(&mut self, index: usize, fragment: &str) -> bool {
        self.messages
            .get_mut(index)
            .map(|message| message.content.push_str(fragment))
            .is_some()
    }

    /// Give the entry at `index` a new identity.
    pub(crate) fn set_id(&mut self, index: usize, id: MessageId) -> bool {
        self.messages
            .get_mut(index)
            .map(|message| message.id = id)
            .is_some()
    }

    /// Annotate the entry carrying `id`. Returns `false` if none does.
    pub fn set_feedback(&mut self, id: &MessageId, feedback: Feedback) -> bool {
        self.messages
            .iter_mut()
            .find(|message| &message.id == id)
            .map(|message| message.feedback = Some(feedback))
            .is_some()
    }

    /// Drop every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
