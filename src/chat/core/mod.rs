//! Core chat types: identifiers, messages, configuration and errors.

pub mod config;
pub mod credentials;
pub mod errors;
pub mod ids;
pub mod message;
pub mod notice;

pub use config::{ApiConfig, ClientConfig, SessionConfig, SocketConfig, StreamingConfig};
pub use credentials::AuthToken;
pub use errors::{ChatError, ChatResult};
pub use ids::{ChatId, LocalIds, MessageId};
pub use message::{Feedback, Message};
pub use notice::{Notice, NoticeLevel};
