use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Per-session broadcast hubs, created lazily on first subscription.
pub struct SessionStreams {
    hubs: DashMap<Uuid, SseHub>,
    capacity: usize,
}

impl SessionStreams {
    /// Build the registry; every hub gets a channel of `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity,
        }
    }

    /// Hub of a session, creating it when nobody subscribed yet.
    pub fn hub(&self, session_id: Uuid) -> SseHub {
        self.hubs
            .entry(session_id)
            .or_insert_with(|| SseHub::new(self.capacity))
            .clone()
    }

    /// Publish to the session's subscribers, if any.
    pub fn publish(&self, session_id: Uuid, event: ServerEvent) {
        if let Some(hub) = self.hubs.get(&session_id) {
            hub.broadcast(event);
        }
    }

    /// Drop the hub of a deleted session, closing its streams.
    pub fn close(&self, session_id: Uuid) {
        self.hubs.remove(&session_id);
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
#[derive(Clone)]
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
