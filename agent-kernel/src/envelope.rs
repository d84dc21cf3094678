//! Minimal message/signal shape routed to a worker's callbacks.

use serde_json::Value;

/// A message or signal delivered to an agent.
///
/// `topic` doubles as the envelope's "kind" so a user behavior can dispatch
/// on it; the runtime itself never inspects it beyond routing.
#[derive(Debug, Clone)]
pub struct Envelope {
    topic: String,
    payload: Value,
}

impl Envelope {
    /// Builds a new envelope.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Returns the envelope's topic/kind.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the envelope's payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}
