//! Chat-history collaborator: session CRUD and feedback.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::errors::ChatResult;
use crate::chat::core::ids::{ChatId, MessageId};
use crate::chat::core::message::{Feedback, Message};

/// Boxed future type for history operations.
pub type HistoryFuture<'a, T> = Pin<Box<dyn Future<Output = ChatResult<T>> + Send + 'a>>;

/// Summary of a chat session as listed in the sidebar.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Backend identifier.
    pub id: ChatId,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Creation time.
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last activity; drives date grouping.
    #[serde(alias = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// One page of the chat list.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionPage {
    /// Sessions on this page.
    pub chats: Vec<SessionSummary>,
    /// Total number of sessions.
    #[serde(default)]
    pub total: u64,
    /// Page number.
    #[serde(default)]
    pub page: u32,
    /// Page size.
    #[serde(default)]
    pub limit: u32,
}

/// Author of a stored message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    /// Typed by the user.
    User,
    /// Produced by the assistant.
    Assistant,
}

/// A message as returned by the history endpoint.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Backend identifier, when the endpoint exposes it.
    #[serde(default)]
    pub id: Option<MessageId>,
    /// Author.
    pub role: HistoryRole,
    /// Content.
    pub content: String,
    /// Stored feedback, if any.
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

/// Full session as returned by the history endpoint.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    /// Backend identifier.
    pub id: ChatId,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Messages in chronological order.
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
}

impl SessionDetail {
    /// Convert stored messages into transcript entries, assigning local
    /// ids to messages the endpoint returned without one.
    #[must_use]
    pub fn into_messages(self, ids: impl FnMut() -> MessageId) -> Vec<Message> {
        let mut ids = ids;
        self.messages
            .into_iter()
            .map(|stored| Message {
                id: stored.id.unwrap_or_else(&mut ids),
                content: stored.content,
                is_bot: stored.role == HistoryRole::Assistant,
                feedback: stored.feedback,
            })
            .collect()
    }
}

/// Request body for creating a session.
#[derive(Clone, Debug, Serialize)]
pub struct CreateSessionRequest {
    /// Title of the new session.
    pub title: String,
}

/// Request body for submitting feedback.
#[derive(Clone, Debug, Serialize)]
pub struct FeedbackRequest {
    /// Confirmed message id.
    pub message_id: String,
    /// -1, 0 or 1.
    pub feedback: i8,
}

/// Backend holding chat sessions and their messages.
pub trait ChatHistory: Send + Sync {
    /// List the sessions of the current user.
    fn list_sessions(&self) -> HistoryFuture<'_, Vec<SessionSummary>>;

    /// Fetch one session with its messages.
    fn fetch_session(&self, id: &ChatId) -> HistoryFuture<'_, SessionDetail>;

    /// Create a session with the given title.
    fn create_session(&self, title: &str) -> HistoryFuture<'_, SessionSummary>;

    /// Record user feedback for a confirmed message.
    fn submit_feedback(&self, message_id: &MessageId, feedback: Feedback)
    -> HistoryFuture<'_, ()>;
}

/// Title for a new session: the first `max_chars` characters of the first
/// message.
#[must_use]
pub fn session_title(first_message: &str, max_chars: usize) -> String {
    first_message.chars().take(max_chars).collect()
}
