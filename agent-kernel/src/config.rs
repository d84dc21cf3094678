//! Tunable parameters for a spawned agent worker.

use std::num::NonZeroUsize;

const DEFAULT_COMMAND_MAILBOX_CAPACITY: usize = 256;

/// Configuration applied when [`crate::worker::spawn`] starts a worker.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    command_mailbox_capacity: NonZeroUsize,
}

impl WorkerConfig {
    /// Builds a config with the given command mailbox capacity.
    #[must_use]
    pub const fn new(command_mailbox_capacity: NonZeroUsize) -> Self {
        Self {
            command_mailbox_capacity,
        }
    }

    /// Returns the bound on queued `get`/`update`/`execute_action`/`message` commands.
    ///
    /// Signals bypass this bound entirely; their channel is unbounded.
    #[must_use]
    pub const fn command_mailbox_capacity(&self) -> NonZeroUsize {
        self.command_mailbox_capacity
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            command_mailbox_capacity: NonZeroUsize::new(DEFAULT_COMMAND_MAILBOX_CAPACITY)
                .expect("non-zero literal"),
        }
    }
}
