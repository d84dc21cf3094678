//! Shared error definitions for agent primitives.

use thiserror::Error;

/// Result alias used throughout the agent runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating agent primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// A typed identifier could not be parsed from its textual form.
    #[error("invalid id `{id}`: {reason}")]
    InvalidId {
        /// The offending textual identifier.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Capability identifier failed validation.
    #[error("invalid capability id `{id}`: {reason}")]
    InvalidCapabilityId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Agent snapshot construction failed validation.
    #[error("invalid agent snapshot: {reason}")]
    InvalidSnapshot {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
