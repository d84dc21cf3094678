//! Tunable parameters for an [`crate::EventBus`](crate::EventBus) instance.

use std::num::NonZeroUsize;

/// Configuration for a running event bus.
#[derive(Debug, Clone, Copy)]
pub struct BusConfig {
    max_history: NonZeroUsize,
    mailbox_capacity: NonZeroUsize,
}

impl BusConfig {
    /// Creates a configuration with the given history capacity.
    #[must_use]
    pub fn new(max_history: NonZeroUsize) -> Self {
        Self {
            max_history,
            mailbox_capacity: NonZeroUsize::new(1024).expect("non-zero"),
        }
    }

    /// Overrides the actor mailbox capacity (default 1024).
    #[must_use]
    pub const fn with_mailbox_capacity(mut self, mailbox_capacity: NonZeroUsize) -> Self {
        self.mailbox_capacity = mailbox_capacity;
        self
    }

    /// Returns the configured history capacity.
    #[must_use]
    pub const fn max_history(self) -> NonZeroUsize {
        self.max_history
    }

    /// Returns the configured mailbox capacity.
    #[must_use]
    pub const fn mailbox_capacity(self) -> NonZeroUsize {
        self.mailbox_capacity
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_history: NonZeroUsize::new(1000).expect("non-zero"),
            mailbox_capacity: NonZeroUsize::new(1024).expect("non-zero"),
        }
    }
}
