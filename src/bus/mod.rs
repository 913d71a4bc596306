//! Event bus between the router and everything that reacts to it
//!
//! Uses tokio::sync::broadcast so the router can publish without ever
//! waiting on a slow subscriber.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Events published by the router
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Handshake event on the `connect` channel
    Connect { payload: Value },
    /// The router stopped reading
    Disconnected { reason: String },
}

/// Event bus handle for publishing and subscribing
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    /// Create a new event bus with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: ClientEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    /// Default capacity (256 events)
    fn default() -> Self {
        Self::new(256)
    }
}

/// Shared event bus wrapped in Arc for thread-safe sharing
pub type SharedBus = Arc<EventBus>;

/// Create a new shared event bus
pub fn create_bus() -> SharedBus {
    Arc::new(EventBus::default())
}
