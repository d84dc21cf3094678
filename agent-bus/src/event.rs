//! The unit of broadcast: a topic-tagged, timestamped payload.

use agent_primitives::{EventId, WorkerHandle};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A single item delivered through the event bus.
///
/// Constructed only by the bus actor on `emit`; subscribers and history
/// readers receive clones.
#[derive(Clone, Debug)]
pub struct Event {
    id: EventId,
    topic: String,
    source: Option<WorkerHandle>,
    data: Value,
    metadata: Value,
    timestamp: DateTime<Utc>,
}

impl Event {
    pub(crate) fn new(
        topic: String,
        data: Value,
        metadata: Value,
        source: Option<WorkerHandle>,
    ) -> Self {
        Self {
            id: EventId::random(),
            topic,
            source,
            data,
            metadata,
            timestamp: Utc::now(),
        }
    }

    /// Returns the event's identifier.
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// Returns the topic this event was emitted on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the worker handle of the originating agent, if any.
    #[must_use]
    pub fn source(&self) -> Option<&WorkerHandle> {
        self.source.as_ref()
    }

    /// Returns the event payload.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Returns event metadata.
    #[must_use]
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// Returns the emission timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
