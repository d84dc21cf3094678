//! Core shared types for the in-process agent runtime: identity, capability
//! tags, agent snapshots, opaque worker handles, and liveness monitoring.

#![warn(missing_docs, clippy::pedantic)]

mod capability;
mod error;
mod handle;
mod ids;
mod snapshot;
mod watch;

/// Symbolic capability tag type.
pub use capability::CapabilityId;
/// Error type and result alias shared across the crate family.
pub use error::{Error, Result};
/// Opaque handle addressing a running agent worker.
pub use handle::WorkerHandle;
/// Typed identifiers for agents, events, and subscribers.
pub use ids::{
    AgentId, AgentKind, EventId, EventKind, IdKind, SubscriberId, SubscriberKind, TypedId,
};
/// Agent snapshot value type, its builder, and the lifecycle enum.
pub use snapshot::{AgentSnapshot, AgentSnapshotBuilder, Lifecycle};
/// Liveness monitoring primitives used by the registry and the event bus.
pub use watch::{LivenessSentinel, LivenessWatch};
