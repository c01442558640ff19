//! Event channel: inbound dispatch, outbound emission and the WebSocket
//! transport.

pub mod bus;
pub mod listener;
pub mod socket;

use std::sync::Arc;

pub use bus::{EventBus, Handler, Subscription};
pub use listener::InboundListener;
pub use socket::SocketChannel;

use crate::chat::core::errors::ChatResult;
use crate::chat::events::OutboundEvent;

/// Outbound side of the event channel.
///
/// Emission is fire-and-forget: success means the event was handed to the
/// transport, not that the backend processed it.
pub trait EventSink: Send + Sync {
    /// Emit an event.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    fn emit(&self, event: &OutboundEvent) -> ChatResult<()>;
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: &OutboundEvent) -> ChatResult<()> {
        (**self).emit(event)
    }
}
