//! In-process event bus for history changes.
//!
//! Every published event is serialized as a [`BusEvent`] and broadcast to
//! all subscribers; the server streams these to clients.
//!
//! # Example
//!
//! ```ignore
//! let bus = Bus::new();
//! let mut rx = bus.subscribe_all();
//! bus.publish(event);
//! let received = rx.recv().await?;
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default channel capacity.
const DEFAULT_CAPACITY: usize = 256;

/// An event that can be published on the bus.
pub trait Event: Serialize {
    /// Dotted event name, e.g. `version.created`.
    fn event_type() -> &'static str;

    /// Owner of the document the event concerns.
    fn owner_id(&self) -> &str;
}

/// Pub/sub hub shared by the history service and the server.
#[derive(Clone)]
pub struct Bus {
    sender: broadcast::Sender<BusEvent>,
}

/// A serialized event as delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    /// Used to scope delivery; not part of the payload.
    #[serde(skip)]
    pub owner_id: String,
    pub payload: serde_json::Value,
}

impl BusEvent {
    /// Whether `actor_id` may see this event.
    pub fn visible_to(&self, actor_id: &str) -> bool {
        self.owner_id == actor_id
    }
}

impl Bus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self { sender }
    }

    /// Publish an event to every subscriber.
    pub fn publish<E: Event>(&self, event: E) {
        match serde_json::to_value(&event) {
            Ok(payload) => {
                // No receivers is fine
                let _ = self.sender.send(BusEvent {
                    event_type: E::event_type().to_string(),
                    owner_id: event.owner_id().to_string(),
                    payload,
                });
            }
            Err(e) => {
                tracing::warn!(event = E::event_type(), error = %e, "Failed to serialize event");
            }
        }
    }

    /// Subscribe to all events.
    pub fn subscribe_all(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

/// A document and its first version were created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCreated {
    pub document_id: String,
    pub owner_id: String,
    pub name: String,
    pub version_id: String,
}

impl Event for DocumentCreated {
    fn event_type() -> &'static str {
        "document.created"
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

/// A document was renamed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRenamed {
    pub document_id: String,
    pub owner_id: String,
    pub name: String,
}

impl Event for DocumentRenamed {
    fn event_type() -> &'static str {
        "document.renamed"
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

/// A version was appended, by an edit or by a restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCreated {
    pub document_id: String,
    pub owner_id: String,
    pub version_id: String,
    pub number: u64,
    pub is_auto_save: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_from_version_id: Option<String>,
}

impl Event for VersionCreated {
    fn event_type() -> &'static str {
        "version.created"
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

/// A version's content was edited in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionUpdated {
    pub document_id: String,
    pub owner_id: String,
    pub version_id: String,
}

impl Event for VersionUpdated {
    fn event_type() -> &'static str {
        "version.updated"
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}
