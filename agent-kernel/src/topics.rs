//! Stable event-bus topic strings emitted by a worker.

/// Emitted after a successful `execute_action`, with
/// `{agent_id, action, params, result}`.
pub const ACTION_EXECUTED: &str = "action_executed";

/// Emitted after a rejected `execute_action`, with
/// `{agent_id, action, params, reason}`.
pub const ACTION_FAILED: &str = "action_failed";
