//! Stable event-bus topic strings emitted by the lifecycle controller.

/// Emitted once `start_agent` has completed `init` and the registry holds
/// the post-init snapshot with `lifecycle = ready`.
pub const AGENT_LIFECYCLE_STARTED: &str = "agent_lifecycle.started";

/// Emitted by `stop_agent` right after the registry's snapshot is marked
/// `terminating`, before the worker is asked to exit.
pub const AGENT_LIFECYCLE_STOPPING: &str = "agent_lifecycle.stopping";

/// Emitted by `stop_agent` after the registration has been removed.
pub const AGENT_LIFECYCLE_STOPPED: &str = "agent_lifecycle.stopped";

/// Emitted when `start_agent` fails at any point before `started` would be
/// emitted (worker spawn failure, registration failure, or `init` failure).
pub const AGENT_LIFECYCLE_START_FAILED: &str = "agent_lifecycle.start_failed";
