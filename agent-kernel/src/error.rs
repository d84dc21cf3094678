//! Error type returned by the per-agent worker.

use thiserror::Error;

/// Failure kinds surfaced by an agent worker.
#[derive(Debug, Error)]
pub enum KernelError {
    /// `handle_action` returned `{error, reason}`, or no handler claimed the
    /// action (the default implementation's `unknown_action` rejection).
    #[error("action rejected: {reason}")]
    ActionRejected {
        /// The reason the callback gave, or `unknown_action: <action>`.
        reason: String,
    },
    /// A user-supplied transform returned an error or panicked.
    #[error("transform failed: {reason}")]
    TransformFailed {
        /// Why the transform failed.
        reason: String,
    },
    /// `handle_action` or `init` panicked.
    #[error("execution failed: {reason}")]
    ExecutionFailed {
        /// Best-effort description of the panic payload.
        reason: String,
    },
    /// `handle_event`, `handle_signal`, or `handle_message` panicked.
    #[error("handler crashed: {reason}")]
    Crash {
        /// Best-effort description of the panic payload.
        reason: String,
    },
    /// The caller's timeout elapsed before a reply arrived. The in-flight
    /// operation on the worker is unaffected and may still commit.
    #[error("operation timed out")]
    Timeout,
    /// Write-through to the registry failed.
    #[error(transparent)]
    Registry(#[from] agent_registry::RegistryError),
    /// The requested lifecycle stage change is not legal from the current stage.
    #[error(transparent)]
    Lifecycle(#[from] crate::lifecycle::LifecycleError),
    /// The worker's mailbox is gone; the worker has exited.
    #[error("worker is no longer running")]
    Closed,
}

/// Result alias for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;
