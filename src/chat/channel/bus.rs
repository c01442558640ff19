//! Named-event handler registry with scoped registration.
//!
//! Each event name holds at most one handler. Subscribing again replaces
//! the previous handler, so re-registering on every (re)mount never
//! delivers an event twice. The returned [`Subscription`] removes the
//! handler when dropped, unless a newer subscription has replaced it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde_json::Value;
use tracing::trace;

/// Callback invoked with the raw event payload.
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

struct Slot {
    token: u64,
    handler: Handler,
}

type Registry = DashMap<String, Slot>;

/// Inbound side of the event channel.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<Registry>,
    next_token: Arc<AtomicU64>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`, replacing any previous handler.
    #[must_use = "dropping the subscription removes the handler"]
    pub fn subscribe<F>(&self, event: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let event = event.into();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .handlers
            .insert(
                event.clone(),
                Slot {
                    token,
                    handler: Arc::new(handler),
                },
            )
            .is_some();
        trace!(event = %event, token, replaced, "handler registered");

        Subscription {
            registry: Arc::downgrade(&self.handlers),
            event,
            token,
        }
    }

    /// Deliver `payload` to the handler of `event`.
    ///
    /// Returns `false` when nobody listens to `event`.
    pub fn dispatch(&self, event: &str, payload: &Value) -> bool {
        // Clone the handler out so no shard lock is held while it runs.
        let handler = self
            .handlers
            .get(event)
            .map(|slot| Arc::clone(&slot.handler));

        match handler {
            Some(handler) => {
                handler(payload);
                true
            }
            None => {
                trace!(event, "no handler registered");
                false
            }
        }
    }

    /// Whether a handler is registered for `event`.
    #[must_use]
    pub fn is_subscribed(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Number of registered event names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Registration guard returned by [`EventBus::subscribe`].
pub struct Subscription {
    registry: Weak<Registry>,
    event: String,
    token: u64,
}

impl Subscription {
    /// Event name this subscription listens to.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let token = self.token;
            let removed = registry
                .remove_if(&self.event, |_, slot| slot.token == token)
                .is_some();
            trace!(event = %self.event, token, removed, "subscription dropped");
        }
    }
}
