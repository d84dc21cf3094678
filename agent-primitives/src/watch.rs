//! Liveness monitoring primitive shared by the registry and the event bus.

use tokio::sync::oneshot;

/// Held by a task whose death must be observable to others.
///
/// Dropping the sentinel — whether the owning task exits normally or panics
/// and unwinds through it — fires the paired [`LivenessWatch`]. Callers keep
/// the sentinel alive for the full lifetime of the task it represents,
/// typically by moving it into the task's future.
#[derive(Debug)]
pub struct LivenessSentinel {
    tx: Option<oneshot::Sender<()>>,
}

impl LivenessSentinel {
    /// Creates a new sentinel/watch pair.
    #[must_use]
    pub fn pair() -> (Self, LivenessWatch) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, LivenessWatch { rx })
    }
}

impl Drop for LivenessSentinel {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Resolves once the paired [`LivenessSentinel`] has been dropped.
#[derive(Debug)]
pub struct LivenessWatch {
    rx: oneshot::Receiver<()>,
}

impl LivenessWatch {
    /// Awaits the owning task's death.
    ///
    /// Resolves both on an explicit drop and when the sentinel's sender is
    /// dropped mid-panic: `oneshot::Receiver` treats channel closure either
    /// way as a resolved (if senderless) receive.
    pub async fn died(self) {
        let _ = self.rx.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn watch_resolves_on_explicit_drop() {
        let (sentinel, watch) = LivenessSentinel::pair();
        drop(sentinel);
        watch.died().await;
    }

    #[tokio::test]
    async fn watch_resolves_when_task_panics() {
        let (sentinel, watch) = LivenessSentinel::pair();
        let handle = tokio::spawn(async move {
            let _sentinel = sentinel;
            panic!("simulated worker crash");
        });

        let _ = handle.await;
        watch.died().await;
    }
}
