//! Real-time event contract: names, inbound payloads and outbound events.

pub mod inbound;
pub mod names;
pub mod outbound;

pub use inbound::{ChunkPayload, ErrorPayload, IncomingMessage, InboundEvent, TypingPayload};
pub use names::EventName;
pub use outbound::OutboundEvent;
