//! The user callback contract a concrete agent implements.
//!
//! Mirrors the per-message-type default-method shape used for protocol
//! dispatch elsewhere in this codebase: every method has a sensible default,
//! so an implementor overrides only what it cares about.

use agent_primitives::AgentSnapshot;
use async_trait::async_trait;
use serde_json::Value;

use crate::envelope::Envelope;

/// Outcome of `handle_action`, mirroring the two shapes a callback may return.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// The action completed; `state` becomes the agent's new state and
    /// `result` is returned to the caller.
    Ok {
        /// New agent state to commit.
        state: Value,
        /// Value returned to the caller.
        result: Value,
    },
    /// The action was rejected; no state change.
    Err {
        /// Human-readable rejection reason.
        reason: String,
    },
}

impl ActionOutcome {
    /// Builds a successful outcome.
    #[must_use]
    pub fn ok(state: Value, result: Value) -> Self {
        Self::Ok { state, result }
    }

    /// Builds a rejected outcome.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Err {
            reason: reason.into(),
        }
    }
}

/// Callback contract implemented by a concrete agent.
///
/// All methods default to the identity behavior described in the external
/// interface: state is left unchanged, and an unclaimed action is rejected.
#[async_trait]
pub trait AgentBehavior: Send + Sync + 'static {
    /// Called once, inside the worker, before the agent becomes `ready`.
    /// Returning `Err` aborts agent startup.
    async fn init(&self, snapshot: &AgentSnapshot, config: &Value) -> Result<Value, String> {
        let _ = config;
        Ok(snapshot.state().clone())
    }

    /// Dispatches a request/response action.
    async fn handle_action(
        &self,
        snapshot: &AgentSnapshot,
        action: &str,
        params: &Value,
    ) -> ActionOutcome {
        let _ = params;
        ActionOutcome::rejected(format!("unknown_action: {action}"))
    }

    /// Handles an event delivered from a bus subscription.
    async fn handle_event(&self, snapshot: &AgentSnapshot, event: &agent_bus::Event) -> Value {
        let _ = event;
        snapshot.state().clone()
    }

    /// Handles a signal: delivered immediately, ahead of any queued messages.
    async fn handle_signal(&self, snapshot: &AgentSnapshot, signal: &Envelope) -> Value {
        let _ = signal;
        snapshot.state().clone()
    }

    /// Handles a queued message.
    async fn handle_message(&self, snapshot: &AgentSnapshot, message: &Envelope) -> Value {
        let _ = message;
        snapshot.state().clone()
    }

    /// Called once as the worker is about to exit.
    async fn terminate(&self, snapshot: &AgentSnapshot, reason: &str) {
        let _ = (snapshot, reason);
    }
}
