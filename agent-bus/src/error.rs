//! Error type returned by fallible event bus operations.

use agent_primitives::SubscriberId;
use thiserror::Error;

/// Result alias for event bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Failure kinds surfaced by the event bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// `subscribe`/`subscribe_pattern` named a subscriber id never created
    /// through [`crate::EventBus::subscriber`].
    #[error("unknown subscriber `{subscriber_id}`")]
    UnknownSubscriber {
        /// The subscriber id that was not recognized.
        subscriber_id: SubscriberId,
    },
    /// A pattern failed to compile (empty segment, or `**` not in trailing position).
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The pattern string as supplied by the caller.
        pattern: String,
        /// Why the pattern was rejected.
        reason: String,
    },
    /// The bus actor has shut down.
    #[error("event bus is closed")]
    Closed,
}
