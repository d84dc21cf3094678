//! Value types held internally by the registry actor.

use std::num::NonZeroUsize;

use agent_primitives::{AgentSnapshot, WorkerHandle};
use chrono::{DateTime, Utc};

/// Configuration for a [`crate::Registry`](crate::Registry) instance.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    mailbox_capacity: NonZeroUsize,
}

impl RegistryConfig {
    /// Creates a configuration with the given mailbox capacity.
    #[must_use]
    pub const fn new(mailbox_capacity: NonZeroUsize) -> Self {
        Self { mailbox_capacity }
    }

    /// Returns the configured mailbox capacity.
    #[must_use]
    pub const fn mailbox_capacity(self) -> NonZeroUsize {
        self.mailbox_capacity
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: NonZeroUsize::new(1024).expect("non-zero"),
        }
    }
}

/// Registration held by the registry for one live agent.
#[derive(Clone, Debug)]
pub(crate) struct RegistrationRecord {
    pub(crate) worker_handle: WorkerHandle,
    pub(crate) agent_snapshot: AgentSnapshot,
    pub(crate) registered_at: DateTime<Utc>,
    pub(crate) last_seen: DateTime<Utc>,
}
