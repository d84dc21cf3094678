//! Opaque handle to a running agent worker.

use std::any::Any;
use std::sync::Arc;

/// Type-erased handle to the task executing an agent's worker loop.
///
/// The registry stores and returns this handle without depending on its
/// concrete type, which lives in the kernel crate above it in the
/// dependency graph. Callers downcast via [`WorkerHandle::downcast`].
#[derive(Clone)]
pub struct WorkerHandle(Arc<dyn Any + Send + Sync>);

impl WorkerHandle {
    /// Wraps a concrete worker handle in an opaque container.
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(handle: T) -> Self {
        Self(Arc::new(handle))
    }

    /// Attempts to recover the concrete handle type.
    #[must_use]
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WorkerHandle").field(&"<opaque>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_recovers_concrete_type() {
        let handle = WorkerHandle::new(42_u32);
        assert_eq!(handle.downcast::<u32>(), Some(&42));
        assert_eq!(handle.downcast::<String>(), None);
    }
}
