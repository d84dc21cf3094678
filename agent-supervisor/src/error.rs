//! Error type returned by the lifecycle controller.

use agent_bus::BusError;
use agent_kernel::KernelError;
use agent_primitives::AgentId;
use agent_registry::RegistryError;
use thiserror::Error;

/// Failure kinds surfaced by [`crate::Supervisor`].
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// `start_agent` failed before the `"agent_lifecycle.started"` event
    /// would have been emitted: worker spawn failure or `init` failure.
    #[error("agent start failed: {reason}")]
    StartFailed {
        /// Why the start attempt failed.
        reason: String,
    },
    /// `start_agent` failed specifically at the registry `register` step.
    #[error("agent registration failed: {reason}")]
    RegistrationFailed {
        /// Why registration was rejected.
        reason: String,
    },
    /// `restart_agent` was called for an id with no current registration.
    #[error("agent {agent_id} is not registered")]
    NotFound {
        /// The id that was looked up.
        agent_id: AgentId,
    },
    /// The worker rejected an operation or crashed.
    #[error(transparent)]
    Kernel(#[from] KernelError),
    /// The registry rejected an operation.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The event bus rejected an operation.
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Result alias for lifecycle-controller operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;
