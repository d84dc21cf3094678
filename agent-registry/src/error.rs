//! Errors surfaced by the registry.

use agent_primitives::AgentId;
use thiserror::Error;

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors produced while registering, looking up, or mutating agents.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// `register` was called with an id that is already present.
    #[error("agent {agent_id} is already registered")]
    AlreadyRegistered {
        /// The colliding agent identifier.
        agent_id: AgentId,
    },

    /// The requested agent id has no registration.
    #[error("agent {agent_id} is not registered")]
    NotFound {
        /// The missing agent identifier.
        agent_id: AgentId,
    },

    /// `update_agent`'s transform raised, panicked, or produced a
    /// non-monotonic version; the registration is left untouched.
    #[error("transform for agent {agent_id} failed: {reason}")]
    TransformFailed {
        /// The agent the transform targeted.
        agent_id: AgentId,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// The registry's actor task has shut down; no further requests can be
    /// served.
    #[error("registry is closed")]
    Closed,
}
