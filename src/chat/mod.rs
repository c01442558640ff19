//! Chat client core: transcript reconciliation, session selection and the
//! real-time event channel.

pub mod channel;
pub mod controller;
pub mod core;
pub mod events;
pub mod reconciler;
pub mod sessions;

pub use channel::{EventBus, EventSink, InboundListener, SocketChannel, Subscription};
pub use controller::{ChatController, SendOutcome};
pub use self::core::{
    ApiConfig, AuthToken, ChatError, ChatId, ChatResult, ClientConfig, Feedback, LocalIds,
    Message, MessageId, Notice, NoticeLevel, SessionConfig, SocketConfig, StreamingConfig,
};
pub use events::{EventName, InboundEvent, OutboundEvent};
pub use reconciler::{Reconciler, StreamingState, Transcript};
pub use sessions::{
    ChatHistory, HttpChatHistory, SessionDetail, SessionGroups, SessionSummary, group_by_date,
};
