//! Strongly typed runtime configuration.

use std::num::NonZeroUsize;

/// Recognized runtime options: event-bus history capacity and whether
/// debug-level logging is enabled.
///
/// Mirrors the builder shape of [`agent_bus::BusConfig`] and
/// [`agent_kernel::WorkerConfig`]: defaults are sensible on their own, and
/// each option is overridden independently.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    max_history: NonZeroUsize,
    debug: bool,
}

impl RuntimeConfig {
    /// Default history capacity, matching [`agent_bus::BusConfig::default`].
    pub const DEFAULT_MAX_HISTORY: usize = 1000;

    /// Creates a configuration with the given history capacity and debug logging off.
    #[must_use]
    pub const fn new(max_history: NonZeroUsize) -> Self {
        Self {
            max_history,
            debug: false,
        }
    }

    /// Overrides whether debug-level logging is enabled.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Returns the configured event-history capacity.
    #[must_use]
    pub const fn max_history(self) -> NonZeroUsize {
        self.max_history
    }

    /// Returns whether debug-level logging is enabled.
    #[must_use]
    pub const fn debug(self) -> bool {
        self.debug
    }

    /// Derives the bus configuration this runtime config implies.
    #[must_use]
    pub fn bus_config(self) -> agent_bus::BusConfig {
        agent_bus::BusConfig::new(self.max_history)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_history: NonZeroUsize::new(Self::DEFAULT_MAX_HISTORY).expect("non-zero"),
            debug: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_history_capacity() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_history().get(), RuntimeConfig::DEFAULT_MAX_HISTORY);
        assert!(!config.debug());
    }

    #[test]
    fn with_debug_overrides_only_debug() {
        let config = RuntimeConfig::new(NonZeroUsize::new(50).unwrap()).with_debug(true);
        assert_eq!(config.max_history().get(), 50);
        assert!(config.debug());
    }

    #[test]
    fn bus_config_carries_max_history() {
        let config = RuntimeConfig::new(NonZeroUsize::new(42).unwrap());
        assert_eq!(config.bus_config().max_history().get(), 42);
    }
}
