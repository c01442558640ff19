//! Queue bridging bus callbacks to the single task that owns the transcript.

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::warn;

use crate::chat::channel::bus::{EventBus, Subscription};
use crate::chat::events::{EventName, InboundEvent};

/// Subscribes to every inbound event name and queues decoded events in
/// arrival order.
///
/// Events keep queuing while the owner is busy awaiting a REST call; they
/// are applied once it polls the listener again. Dropping the listener
/// unregisters all its handlers.
pub struct InboundListener {
    receiver: UnboundedReceiver<InboundEvent>,
    _subscriptions: Vec<Subscription>,
}

impl InboundListener {
    /// Register handlers for all inbound events on `bus`.
    #[must_use]
    pub fn attach(bus: &EventBus) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        let subscriptions = EventName::INBOUND
            .iter()
            .map(|&name| {
                let sender = sender.clone();
                bus.subscribe(name.as_str(), move |payload| {
                    match InboundEvent::parse(name, payload) {
                        Ok(event) => {
                            // The receiver only goes away together with the subscriptions.
                            let _ = sender.send(event);
                        }
                        Err(err) => warn!(event = %name, error = %err, "dropping inbound event"),
                    }
                })
            })
            .collect();

        Self {
            receiver,
            _subscriptions: subscriptions,
        }
    }

    /// Wait for the next inbound event.
    pub async fn recv(&mut self) -> Option<InboundEvent> {
        self.receiver.recv().await
    }

    /// Take the next queued event without waiting.
    pub fn try_next(&mut self) -> Option<InboundEvent> {
        self.receiver.try_recv().ok()
    }
}
