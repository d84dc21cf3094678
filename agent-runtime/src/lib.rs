//! Agent runtime SDK facade.
//!
//! Depend on this crate via `cargo add agent-runtime`. It bundles the
//! internal runtime crates behind feature flags so downstream users can
//! enable or disable components as needed: the directory and bus alone for a
//! read-only dashboard, the full stack for a process that starts and stops
//! its own agents.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use agent_primitives as primitives;

/// Agent directory: snapshots, indices, worker liveness (enabled by `registry` feature).
#[cfg(feature = "registry")]
pub use agent_registry as registry;

/// Publish/subscribe event bus (enabled by `bus` feature).
#[cfg(feature = "bus")]
pub use agent_bus as bus;

/// Per-agent worker and callback contract (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use agent_kernel as kernel;

/// Lifecycle controller: `start_agent`/`stop_agent`/`restart_agent` (enabled by `supervisor` feature).
#[cfg(feature = "supervisor")]
pub use agent_supervisor as supervisor;

/// Ambient runtime configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use agent_config as config;
