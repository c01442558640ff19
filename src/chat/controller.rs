//! Chat controller: the single owner of the active session.
//!
//! Commands that reach the backend are `async` and take `&mut self`, so
//! the transcript is never touched from two places at once. Inbound events
//! that arrive meanwhile wait in the [`InboundListener`] queue and are
//! applied in arrival order by [`ChatController::apply_pending`].

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::chat::channel::{EventSink, InboundListener};
use crate::chat::core::config::ClientConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{ChatId, MessageId};
use crate::chat::core::message::Feedback;
use crate::chat::core::notice::Notice;
use crate::chat::events::{InboundEvent, OutboundEvent};
use crate::chat::reconciler::{Reconciler, StreamingState, Transcript};
use crate::chat::sessions::{ChatHistory, SessionGroups, SessionSummary, group_by_date, session_title};

/// Notice shown when the session list cannot be loaded.
pub const HISTORY_LOAD_FAILED: &str = "Failed to load chat history";
/// Notice shown when a session cannot be opened.
pub const CHAT_LOAD_FAILED: &str = "Failed to load chat";
/// Notice shown when a new session cannot be created.
pub const CHAT_CREATE_FAILED: &str = "Failed to create a new chat";
/// Notice shown when a message cannot be handed to the channel.
pub const SEND_FAILED: &str = "Failed to send message";
/// Notice shown when feedback is rejected.
pub const FEEDBACK_FAILED: &str = "Failed to submit feedback";

/// Result of [`ChatController::send_message`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SendOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// Sent on the already active session.
    Sent {
        /// Session the message went to.
        chat_id: ChatId,
    },
    /// A session was created for the first message and then sent on.
    SentToNewSession {
        /// The session that was created.
        session: SessionSummary,
    },
}

/// Drives one chat view: transcript, session list and outbound commands.
pub struct ChatController<H, S> {
    reconciler: Reconciler,
    history: H,
    sink: S,
    active_chat: Option<ChatId>,
    sessions: SessionGroups,
    newly_created: Option<ChatId>,
    notices: Vec<Notice>,
    title_max_chars: usize,
}

impl<H: ChatHistory, S: EventSink> ChatController<H, S> {
    /// Create a controller with no active session.
    pub fn new(history: H, sink: S, config: &ClientConfig) -> Self {
        Self {
            reconciler: Reconciler::new(config.streaming.enabled),
            history,
            sink,
            active_chat: None,
            sessions: SessionGroups::default(),
            newly_created: None,
            notices: Vec::new(),
            title_max_chars: config.session.title_max_chars,
        }
    }

    /// Current transcript.
    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        self.reconciler.transcript()
    }

    /// Current streaming flags.
    #[must_use]
    pub const fn state(&self) -> &StreamingState {
        self.reconciler.state()
    }

    /// Whether chunks are applied as they arrive.
    #[must_use]
    pub const fn streaming_enabled(&self) -> bool {
        self.reconciler.streaming_enabled()
    }

    /// Session the transcript belongs to.
    #[must_use]
    pub const fn active_chat(&self) -> Option<&ChatId> {
        self.active_chat.as_ref()
    }

    /// Grouped session list.
    #[must_use]
    pub const fn sessions(&self) -> &SessionGroups {
        &self.sessions
    }

    /// History collaborator.
    #[must_use]
    pub const fn history(&self) -> &H {
        &self.history
    }

    /// Outbound side of the channel.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Give back the collaborators.
    pub fn into_parts(self) -> (H, S) {
        (self.history, self.sink)
    }

    /// Drain queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Id of the session created by the last first-message send, once.
    pub fn take_newly_created(&mut self) -> Option<ChatId> {
        self.newly_created.take()
    }

    /// Apply one inbound event.
    pub fn apply(&mut self, event: InboundEvent) {
        if let Some(notice) = self.reconciler.apply(event) {
            self.notices.push(notice);
        }
    }

    /// Apply every event queued on `listener`. Returns how many were applied.
    pub fn apply_pending(&mut self, listener: &mut InboundListener) -> usize {
        let mut applied = 0;
        while let Some(event) = listener.try_next() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Send a user message, creating a session first if none is active.
    ///
    /// Blank input is ignored. The optimistic user entry is appended before
    /// any backend contact and stays even if sending fails.
    ///
    /// # Errors
    /// Returns an error if the session cannot be created or the channel
    /// rejects the message. An error notice is queued in both cases.
    pub async fn send_message(&mut self, content: &str) -> ChatResult<SendOutcome> {
        if content.trim().is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        self.reconciler.push_user_message(content);

        if let Some(chat_id) = self.active_chat.clone() {
            self.emit_message(&chat_id, content)?;
            self.reconciler.begin_turn();
            return Ok(SendOutcome::Sent { chat_id });
        }

        let title = session_title(content, self.title_max_chars);
        let session = match self.history.create_session(&title).await {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "chat creation failed");
                self.notices.push(Notice::error(CHAT_CREATE_FAILED));
                return Err(err);
            }
        };

        info!(chat_id = %session.id, title = %session.title, "started new chat");
        self.sessions.prepend_today(session.clone());
        self.active_chat = Some(session.id.clone());
        self.newly_created = Some(session.id.clone());

        self.emit_message(&session.id, content)?;
        self.reconciler.expect_response();
        self.reconciler.begin_turn();
        Ok(SendOutcome::SentToNewSession { session })
    }

    fn emit_message(&mut self, chat_id: &ChatId, content: &str) -> ChatResult<()> {
        let event = OutboundEvent::SendMessage {
            chat_id: chat_id.clone(),
            message: content.to_string(),
        };
        self.sink.emit(&event).inspect_err(|err| {
            warn!(chat_id = %chat_id, error = %err, "message not sent");
            self.notices.push(Notice::error(SEND_FAILED));
        })
    }

    /// Ask the backend to stop the current reply.
    ///
    /// `response_in_flight` is cleared right away; content streamed so far
    /// stays in the transcript. Without an active session nothing is
    /// emitted.
    ///
    /// # Errors
    /// Returns an error if the channel rejects the stop request.
    pub fn stop_response(&mut self) -> ChatResult<()> {
        self.reconciler.request_stop();

        let Some(chat_id) = self.active_chat.clone() else {
            debug!("stop requested without an active chat");
            return Ok(());
        };

        self.sink
            .emit(&OutboundEvent::StopStream { chat_id })
            .inspect_err(|err| warn!(error = %err, "stop request not sent"))
    }

    /// Load a session and make it active.
    ///
    /// # Errors
    /// Returns an error if the session cannot be fetched. The previous
    /// transcript and active session are kept and an error notice is
    /// queued.
    pub async fn select_session(&mut self, chat_id: &ChatId) -> ChatResult<()> {
        let detail = match self.history.fetch_session(chat_id).await {
            Ok(detail) => detail,
            Err(err) => {
                warn!(chat_id = %chat_id, error = %err, "chat load failed");
                self.notices.push(Notice::error(CHAT_LOAD_FAILED));
                return Err(err);
            }
        };

        let messages = detail.into_messages(|| self.reconciler.next_local_id());
        debug!(chat_id = %chat_id, messages = messages.len(), "chat loaded");
        self.reconciler.replace(messages);
        self.active_chat = Some(chat_id.clone());
        Ok(())
    }

    /// Leave the active session; the next message creates a new one.
    pub fn start_new_session(&mut self) {
        self.active_chat = None;
        self.reconciler.reset();
    }

    /// Submit feedback for a confirmed message.
    ///
    /// # Errors
    /// Returns [`ChatError::UnconfirmedMessage`] for a message that only
    /// has a local id, or the backend error if submission fails.
    pub async fn give_feedback(&mut self, message_id: &MessageId, feedback: Feedback) -> ChatResult<()> {
        if !message_id.is_confirmed() {
            return Err(ChatError::UnconfirmedMessage(message_id.to_string()));
        }

        if let Err(err) = self.history.submit_feedback(message_id, feedback).await {
            warn!(message_id = %message_id, error = %err, "feedback failed");
            self.notices.push(Notice::error(FEEDBACK_FAILED));
            return Err(err);
        }

        if !self.reconciler.set_feedback(message_id, feedback) {
            debug!(message_id = %message_id, "feedback stored for a message not in view");
        }
        Ok(())
    }

    /// Reload and regroup the session list.
    ///
    /// # Errors
    /// Returns an error if the list cannot be fetched; an error notice is
    /// queued and the previous grouping kept.
    pub async fn refresh_sessions(&mut self) -> ChatResult<()> {
        match self.history.list_sessions().await {
            Ok(sessions) => {
                self.sessions = group_by_date(&sessions, Utc::now());
                debug!(listed = sessions.len(), grouped = self.sessions.len(), "sessions refreshed");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "chat history load failed");
                self.notices.push(Notice::error(HISTORY_LOAD_FAILED));
                Err(err)
            }
        }
    }

    /// Load the session list and open the most recent session, if any.
    /// Returns the id of the opened session.
    ///
    /// # Errors
    /// Returns an error if the list or the session cannot be loaded.
    pub async fn bootstrap(&mut self) -> ChatResult<Option<ChatId>> {
        self.refresh_sessions().await?;

        let Some(latest) = self.sessions.most_recent().map(|s| s.id.clone()) else {
            return Ok(None);
        };
        self.select_session(&latest).await?;
        Ok(Some(latest))
    }

    /// Toggle streaming mode.
    pub fn set_streaming(&mut self, enabled: bool) {
        self.reconciler.set_streaming(enabled);
        let label = if enabled { "enabled" } else { "disabled" };
        self.notices
            .push(Notice::info(format!("Streaming mode {label}")));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, PoisonError};

    use chrono::Duration;

    use super::*;
    use crate::chat::core::message::Message;
    use crate::chat::core::notice::NoticeLevel;
    use crate::chat::events::{ChunkPayload, IncomingMessage, TypingPayload};
    use crate::chat::sessions::{HistoryFuture, HistoryMessage, HistoryRole, SessionDetail};

    #[derive(Default)]
    struct FakeHistory {
        sessions: Vec<SessionSummary>,
        details: Vec<SessionDetail>,
        fail: bool,
        created_titles: Mutex<Vec<String>>,
        feedback: Mutex<Vec<(MessageId, Feedback)>>,
    }

    impl FakeHistory {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn check(&self) -> ChatResult<()> {
            if self.fail {
                Err(ChatError::Api {
                    status: 500,
                    context: "test".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    impl ChatHistory for FakeHistory {
        fn list_sessions(&self) -> HistoryFuture<'_, Vec<SessionSummary>> {
            Box::pin(async move {
                self.check()?;
                Ok(self.sessions.clone())
            })
        }

        fn fetch_session(&self, id: &ChatId) -> HistoryFuture<'_, SessionDetail> {
            let id = id.clone();
            Box::pin(async move {
                self.check()?;
                self.details
                    .iter()
                    .find(|detail| detail.id == id)
                    .cloned()
                    .ok_or(ChatError::Api {
                        status: 404,
                        context: "fetching chat".to_string(),
                    })
            })
        }

        fn create_session(&self, title: &str) -> HistoryFuture<'_, SessionSummary> {
            let title = title.to_string();
            Box::pin(async move {
                self.check()?;
                self.created_titles
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(title.clone());
                Ok(SessionSummary {
                    id: ChatId::new("new-chat"),
                    title,
                    created_at: None,
                    updated_at: Utc::now(),
                })
            })
        }

        fn submit_feedback(
            &self,
            message_id: &MessageId,
            feedback: Feedback,
        ) -> HistoryFuture<'_, ()> {
            let message_id = message_id.clone();
            Box::pin(async move {
                self.check()?;
                self.feedback
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((message_id, feedback));
                Ok(())
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        emitted: Mutex<Vec<OutboundEvent>>,
    }

    impl RecordingSink {
        fn emitted(&self) -> Vec<OutboundEvent> {
            self.emitted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: &OutboundEvent) -> ChatResult<()> {
            self.emitted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
            Ok(())
        }
    }

    struct OfflineSink;

    impl EventSink for OfflineSink {
        fn emit(&self, _event: &OutboundEvent) -> ChatResult<()> {
            Err(ChatError::NotConnected)
        }
    }

    fn controller(history: FakeHistory) -> ChatController<FakeHistory, RecordingSink> {
        ChatController::new(history, RecordingSink::default(), &ClientConfig::default())
    }

    fn detail(id: &str, messages: &[(HistoryRole, &str, &str)]) -> SessionDetail {
        SessionDetail {
            id: ChatId::new(id),
            title: id.to_string(),
            messages: messages
                .iter()
                .map(|&(role, msg_id, content)| HistoryMessage {
                    id: Some(MessageId::remote(msg_id)),
                    role,
                    content: content.to_string(),
                    feedback: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_first_message_creates_session() {
        let mut chat = controller(FakeHistory::default());

        let session = match chat.send_message("hi").await {
            Ok(SendOutcome::SentToNewSession { session }) => session,
            other => panic!("unexpected outcome: {other:?}"),
        };

        assert_eq!(session.id.as_str(), "new-chat");
        assert_eq!(chat.active_chat(), Some(&ChatId::new("new-chat")));
        assert_eq!(chat.take_newly_created(), Some(ChatId::new("new-chat")));
        assert_eq!(chat.take_newly_created(), None);
        assert_eq!(chat.sessions().today.first().map(|s| &s.id), Some(&session.id));
        assert!(chat.state().response_in_flight);
        assert!(!chat.state().message_done);

        assert_eq!(
            chat.sink().emitted(),
            vec![OutboundEvent::SendMessage {
                chat_id: ChatId::new("new-chat"),
                message: "hi".to_string(),
            }]
        );
        assert_eq!(chat.transcript().len(), 1);
        assert!(!chat.transcript().messages()[0].is_bot);
    }

    #[tokio::test]
    async fn test_session_title_is_truncated() {
        let mut chat = controller(FakeHistory::default());
        let long = "a".repeat(45);

        let _ = chat.send_message(&long).await;

        let titles = chat
            .history()
            .created_titles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        assert_eq!(titles, vec!["a".repeat(30)]);
    }

    #[tokio::test]
    async fn test_follow_up_uses_active_session() {
        let mut chat = controller(FakeHistory::default());
        let _ = chat.send_message("first").await;

        let outcome = chat.send_message("second").await;

        assert!(matches!(outcome, Ok(SendOutcome::Sent { ref chat_id }) if chat_id.as_str() == "new-chat"));
        assert_eq!(chat.sink().emitted().len(), 2);
        assert_eq!(chat.sessions().today.len(), 1);
        assert_eq!(chat.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_message_is_ignored() {
        let mut chat = controller(FakeHistory::default());

        let outcome = chat.send_message("   \n").await;

        assert!(matches!(outcome, Ok(SendOutcome::Ignored)));
        assert!(chat.transcript().is_empty());
        assert!(chat.sink().emitted().is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_keeps_optimistic_message() {
        let mut chat = controller(FakeHistory::failing());

        let outcome = chat.send_message("hi").await;

        assert!(matches!(outcome, Err(ChatError::Api { status: 500, .. })));
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.transcript().messages()[0].content, "hi");
        assert!(chat.active_chat().is_none());
        assert!(chat.sink().emitted().is_empty());
        assert_eq!(chat.take_notices(), vec![Notice::error(CHAT_CREATE_FAILED)]);
    }

    #[tokio::test]
    async fn test_offline_send_queues_notice() {
        let history = FakeHistory {
            details: vec![detail("c1", &[])],
            ..FakeHistory::default()
        };
        let mut chat = ChatController::new(history, OfflineSink, &ClientConfig::default());
        assert!(chat.select_session(&ChatId::new("c1")).await.is_ok());

        let outcome = chat.send_message("hello").await;

        assert!(matches!(outcome, Err(ChatError::NotConnected)));
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.take_notices(), vec![Notice::error(SEND_FAILED)]);
    }

    #[tokio::test]
    async fn test_stop_then_stream_stopped() {
        let mut chat = controller(FakeHistory::default());
        let _ = chat.send_message("hi").await;
        chat.apply(InboundEvent::Typing(TypingPayload { is_bot: true }));
        chat.apply(InboundEvent::MessageChunk(ChunkPayload {
            content: "partial".to_string(),
        }));

        assert!(chat.stop_response().is_ok());
        assert!(!chat.state().response_in_flight);
        assert_eq!(
            chat.sink().emitted().last(),
            Some(&OutboundEvent::StopStream {
                chat_id: ChatId::new("new-chat")
            })
        );

        chat.apply(InboundEvent::StreamStopped);
        assert!(!chat.state().is_typing);
        assert!(!chat.state().response_in_flight);
        assert_eq!(chat.transcript().last().map(|m| m.content.as_str()), Some("partial"));
    }

    #[test]
    fn test_stop_without_active_chat_emits_nothing() {
        let mut chat = controller(FakeHistory::default());

        assert!(chat.stop_response().is_ok());
        assert!(chat.sink().emitted().is_empty());
    }

    #[tokio::test]
    async fn test_select_session_replaces_transcript() {
        let history = FakeHistory {
            details: vec![detail(
                "c2",
                &[
                    (HistoryRole::User, "u1", "question"),
                    (HistoryRole::Assistant, "a1", "answer"),
                ],
            )],
            ..FakeHistory::default()
        };
        let mut chat = controller(history);
        let _ = chat.send_message("draft").await;

        assert!(chat.select_session(&ChatId::new("c2")).await.is_ok());

        assert_eq!(chat.active_chat(), Some(&ChatId::new("c2")));
        assert_eq!(
            chat.transcript().messages(),
            &[
                Message::user(MessageId::remote("u1"), "question"),
                Message::assistant(MessageId::remote("a1"), "answer"),
            ]
        );
        assert_eq!(chat.state(), &StreamingState::idle());
    }

    #[tokio::test]
    async fn test_select_failure_keeps_previous_chat() {
        let history = FakeHistory {
            details: vec![detail("c1", &[(HistoryRole::User, "u1", "kept")])],
            ..FakeHistory::default()
        };
        let mut chat = controller(history);
        assert!(chat.select_session(&ChatId::new("c1")).await.is_ok());

        let result = chat.select_session(&ChatId::new("missing")).await;

        assert!(result.is_err());
        assert_eq!(chat.active_chat(), Some(&ChatId::new("c1")));
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.take_notices(), vec![Notice::error(CHAT_LOAD_FAILED)]);
    }

    #[tokio::test]
    async fn test_start_new_session_clears_view() {
        let mut chat = controller(FakeHistory::default());
        let _ = chat.send_message("hi").await;

        chat.start_new_session();

        assert!(chat.active_chat().is_none());
        assert!(chat.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_feedback_on_confirmed_message() {
        let history = FakeHistory {
            details: vec![detail("c1", &[(HistoryRole::Assistant, "a1", "answer")])],
            ..FakeHistory::default()
        };
        let mut chat = controller(history);
        assert!(chat.select_session(&ChatId::new("c1")).await.is_ok());

        let id = MessageId::remote("a1");
        assert!(chat.give_feedback(&id, Feedback::Positive).await.is_ok());

        assert_eq!(chat.transcript().messages()[0].feedback, Some(Feedback::Positive));
        let submitted = chat
            .history()
            .feedback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        assert_eq!(submitted, vec![(id, Feedback::Positive)]);
    }

    #[tokio::test]
    async fn test_feedback_on_local_message_rejected() {
        let mut chat = controller(FakeHistory::default());
        let _ = chat.send_message("hi").await;
        let local = chat.transcript().messages()[0].id.clone();

        let result = chat.give_feedback(&local, Feedback::Negative).await;

        assert!(matches!(result, Err(ChatError::UnconfirmedMessage(_))));
        assert!(chat.transcript().messages()[0].feedback.is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_opens_most_recent() {
        let now = Utc::now();
        let history = FakeHistory {
            sessions: vec![
                SessionSummary {
                    id: ChatId::new("recent"),
                    title: "recent".to_string(),
                    created_at: None,
                    updated_at: now,
                },
                SessionSummary {
                    id: ChatId::new("stale"),
                    title: "stale".to_string(),
                    created_at: None,
                    updated_at: now - Duration::days(30),
                },
            ],
            details: vec![detail("recent", &[(HistoryRole::User, "u1", "hello")])],
            ..FakeHistory::default()
        };
        let mut chat = controller(history);

        let opened = chat.bootstrap().await;

        assert!(matches!(opened, Ok(Some(ref id)) if id.as_str() == "recent"));
        assert_eq!(chat.sessions().len(), 1);
        assert_eq!(chat.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_failure_queues_notice() {
        let mut chat = controller(FakeHistory::failing());

        assert!(chat.bootstrap().await.is_err());
        assert_eq!(chat.take_notices(), vec![Notice::error(HISTORY_LOAD_FAILED)]);
    }

    #[tokio::test]
    async fn test_streamed_reply_reconciles_with_echo() {
        let mut chat = controller(FakeHistory::default());
        let _ = chat.send_message("hi").await;

        chat.apply(InboundEvent::Typing(TypingPayload { is_bot: true }));
        for part in ["Hel", "lo"] {
            chat.apply(InboundEvent::MessageChunk(ChunkPayload {
                content: part.to_string(),
            }));
        }
        chat.apply(InboundEvent::NewMessage(IncomingMessage {
            id: MessageId::remote("srv1"),
            content: "Hello".to_string(),
            is_bot: true,
        }));

        assert_eq!(chat.transcript().len(), 2);
        assert_eq!(
            chat.transcript().last(),
            Some(&Message::assistant(MessageId::remote("srv1"), "Hello"))
        );
        assert!(!chat.state().response_in_flight);
    }

    #[test]
    fn test_set_streaming_queues_info_notice() {
        let mut chat = controller(FakeHistory::default());

        chat.set_streaming(false);

        assert!(!chat.streaming_enabled());
        let notices = chat.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Info);
        assert_eq!(notices[0].message, "Streaming mode disabled");
    }

    #[test]
    fn test_backend_error_surfaces_generic_notice() {
        let mut chat = controller(FakeHistory::default());

        chat.apply(InboundEvent::Error(crate::chat::events::ErrorPayload(
            serde_json::json!({"message": "boom"}),
        )));

        assert_eq!(
            chat.take_notices(),
            vec![Notice::error(crate::chat::reconciler::GENERIC_FAILURE)]
        );
    }
}
