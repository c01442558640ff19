//! Chat sessions: history collaborator, REST client and date grouping.

pub mod grouping;
pub mod history;
pub mod http;

pub use grouping::{PREVIOUS_7_DAYS, SessionGroups, TODAY, YESTERDAY, group_by_date};
pub use history::{
    ChatHistory, HistoryFuture, HistoryMessage, HistoryRole, SessionDetail, SessionPage,
    SessionSummary, session_title,
};
pub use http::HttpChatHistory;
