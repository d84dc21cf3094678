//! Stable event-bus topic strings emitted by the registry.

/// Emitted when the registry deregisters an agent whose worker died without
/// going through `stop_agent` (panic, process abort). Payload is
/// `{agent_id}`.
pub const AGENT_TERMINATED: &str = "agent_terminated";
