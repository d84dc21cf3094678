//! Optional forwarding of emitted events to an external broadcast layer.

use crate::event::Event;

/// Opaque forwarding target fed `(topic, event)` pairs after local fan-out.
///
/// Installed once at [`crate::EventBus`](crate::EventBus) construction.
/// Forwarding is best-effort: failures are logged and never propagated back
/// to the emitter.
pub trait ExternalSink: Send + Sync {
    /// Forwards one event. Implementations should not block the caller for
    /// long; offload slow I/O to a background task if needed.
    ///
    /// # Errors
    ///
    /// Returns a human-readable failure description, which the bus logs at
    /// `warn` level and otherwise ignores.
    fn forward(&self, topic: &str, event: &Event) -> Result<(), String>;
}
