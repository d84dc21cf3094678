//! Validates transitions of an agent's [`Lifecycle`](agent_primitives::Lifecycle) stage.
//!
//! The stage lives on the [`AgentSnapshot`](agent_primitives::AgentSnapshot)
//! itself; this module only guards which transitions are legal, the same
//! `match (state, event) -> Option<next>` shape used throughout the
//! surrounding crates for state machines.

use agent_primitives::{AgentId, Lifecycle};
use thiserror::Error;

/// Events that drive an agent's lifecycle stage forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The user `init` callback completed successfully.
    InitCompleted,
    /// The lifecycle controller requested shutdown.
    Retire,
    /// The worker has finished draining and is about to exit.
    Terminate,
}

/// Applies `event` to `current`, returning the resulting stage.
///
/// # Errors
///
/// Returns [`LifecycleError::InvalidTransition`] when `event` is not legal
/// from `current`.
pub fn transition(
    agent_id: AgentId,
    current: Lifecycle,
    event: LifecycleEvent,
) -> LifecycleResult<Lifecycle> {
    let next = match (current, event) {
        (Lifecycle::Initializing, LifecycleEvent::InitCompleted) => Some(Lifecycle::Ready),
        (Lifecycle::Ready, LifecycleEvent::Retire) => Some(Lifecycle::Terminating),
        (Lifecycle::Terminating, LifecycleEvent::Terminate) => Some(Lifecycle::Stopped),
        _ => None,
    };

    next.ok_or(LifecycleError::InvalidTransition {
        agent_id,
        from: current,
        event,
    })
}

/// Errors produced while validating a lifecycle transition.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `event` is not a legal transition from `from`.
    #[error("invalid lifecycle transition from {from:?} via {event:?} for agent {agent_id}")]
    InvalidTransition {
        /// Identifier of the agent whose transition failed.
        agent_id: AgentId,
        /// Stage prior to the attempted transition.
        from: Lifecycle,
        /// Event that triggered the failure.
        event: LifecycleEvent,
    },
}

/// Result alias for lifecycle transition validation.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializing_to_ready_to_terminating_to_stopped() {
        let agent_id = AgentId::random();

        let ready = transition(agent_id, Lifecycle::Initializing, LifecycleEvent::InitCompleted).unwrap();
        assert_eq!(ready, Lifecycle::Ready);

        let terminating = transition(agent_id, ready, LifecycleEvent::Retire).unwrap();
        assert_eq!(terminating, Lifecycle::Terminating);

        let stopped = transition(agent_id, terminating, LifecycleEvent::Terminate).unwrap();
        assert_eq!(stopped, Lifecycle::Stopped);
    }

    #[test]
    fn retire_before_ready_is_rejected() {
        let agent_id = AgentId::random();
        let err = transition(agent_id, Lifecycle::Initializing, LifecycleEvent::Retire)
            .expect_err("should fail");
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    }

    #[test]
    fn terminate_before_retire_is_rejected() {
        let agent_id = AgentId::random();
        let err = transition(agent_id, Lifecycle::Ready, LifecycleEvent::Terminate)
            .expect_err("should fail");
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    }
}
