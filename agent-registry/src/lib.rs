//! Authoritative directory mapping agent identity to snapshot, worker handle,
//! and indices, with automatic removal when a worker dies.
//!
//! The registry is realized as a single task owning a private `HashMap`,
//! reachable only through a `tokio::sync::mpsc` mailbox. That structure gives
//! FIFO serialization of every operation for free, rather than through an
//! explicit lock: at most one [`Command`](command::Command) is being handled
//! at any instant, in the order it arrived.

#![warn(missing_docs, clippy::pedantic)]

mod actor;
mod command;
mod error;
mod record;
pub mod topics;

use agent_bus::EventBus;
use agent_primitives::{AgentId, AgentSnapshot, CapabilityId, LivenessWatch, WorkerHandle};
use tokio::sync::{mpsc, oneshot};

use command::{Command, Transform};

/// Error type and result alias for registry operations.
pub use error::{RegistryError, RegistryResult};
/// Tunable registry parameters.
pub use record::RegistryConfig;

/// Handle to a running registry actor.
///
/// Cheaply `Clone`able; every clone shares the same underlying mailbox, so
/// any number of workers and the lifecycle controller can hold one.
#[derive(Clone, Debug)]
pub struct Registry {
    sender: mpsc::Sender<Command>,
}

impl Registry {
    /// Spawns a new registry actor and returns a handle to it.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_bus_opt(config, None)
    }

    /// Spawns a new registry actor that publishes [`topics::AGENT_TERMINATED`]
    /// to `bus` whenever a worker dies without going through `unregister`.
    #[must_use]
    pub fn with_bus(config: RegistryConfig, bus: EventBus) -> Self {
        Self::with_bus_opt(config, Some(bus))
    }

    fn with_bus_opt(config: RegistryConfig, bus: Option<EventBus>) -> Self {
        let (tx, rx) = mpsc::channel(config.mailbox_capacity().get());
        let self_tx = tx.clone();
        tokio::spawn(actor::run(rx, self_tx, bus));
        Self { sender: tx }
    }

    /// Registers a freshly started agent, installing a liveness watch on its
    /// worker atomically with the index updates.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyRegistered`] if the snapshot's id is
    /// already present. Returns [`RegistryError::Closed`] if the actor has
    /// shut down.
    pub async fn register(
        &self,
        snapshot: AgentSnapshot,
        worker_handle: WorkerHandle,
        watch: LivenessWatch,
    ) -> RegistryResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Register {
            snapshot,
            worker_handle,
            watch,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RegistryError::Closed)?
    }

    /// Returns the current snapshot for `agent_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no registration exists.
    pub async fn get_agent(&self, agent_id: AgentId) -> RegistryResult<AgentSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::GetAgent { agent_id, reply }).await?;
        rx.await.map_err(|_| RegistryError::Closed)?
    }

    /// Returns the opaque worker handle for `agent_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no registration exists.
    pub async fn get_worker(&self, agent_id: AgentId) -> RegistryResult<WorkerHandle> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::GetWorker { agent_id, reply }).await?;
        rx.await.map_err(|_| RegistryError::Closed)?
    }

    /// Applies `transform` to the current snapshot and commits the result.
    ///
    /// The transform must produce a snapshot whose version is exactly one
    /// greater than the current version; any other outcome is rejected and
    /// the registration is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if the agent is unknown, or
    /// [`RegistryError::TransformFailed`] if the transform errors or produces
    /// a non-monotonic version.
    pub async fn update_agent<F>(&self, agent_id: AgentId, transform: F) -> RegistryResult<AgentSnapshot>
    where
        F: FnOnce(&AgentSnapshot) -> Result<AgentSnapshot, String> + Send + 'static,
    {
        let transform: Transform = Box::new(transform);
        let (reply, rx) = oneshot::channel();
        self.send(Command::UpdateAgent {
            agent_id,
            transform,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RegistryError::Closed)?
    }

    /// Lists every currently registered agent of the given type tag.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Closed`] if the actor has shut down.
    pub async fn find_by_type(&self, agent_type: impl Into<String>) -> RegistryResult<Vec<AgentSnapshot>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::FindByType {
            agent_type: agent_type.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| RegistryError::Closed)
    }

    /// Lists every currently registered agent advertising `capability`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Closed`] if the actor has shut down.
    pub async fn find_by_capability(&self, capability: CapabilityId) -> RegistryResult<Vec<AgentSnapshot>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::FindByCapability { capability, reply })
            .await?;
        rx.await.map_err(|_| RegistryError::Closed)
    }

    /// Lists every currently registered agent.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Closed`] if the actor has shut down.
    pub async fn list_all(&self) -> RegistryResult<Vec<AgentSnapshot>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ListAll { reply }).await?;
        rx.await.map_err(|_| RegistryError::Closed)
    }

    /// Removes the registration for `agent_id`, if any. Idempotent: calling
    /// this for an id that is absent, or twice in a row, succeeds silently.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Closed`] if the actor has shut down.
    pub async fn unregister(&self, agent_id: AgentId) -> RegistryResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Unregister { agent_id, reply }).await?;
        rx.await.map_err(|_| RegistryError::Closed)
    }

    async fn send(&self, command: Command) -> RegistryResult<()> {
        self.sender
            .send(command)
            .await
            .map_err(|_| RegistryError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_primitives::{AgentSnapshot, CapabilityId, LivenessSentinel, Lifecycle};

    fn registry() -> Registry {
        Registry::new(RegistryConfig::default())
    }

    fn snapshot_with(agent_type: &str, capabilities: &[&str]) -> AgentSnapshot {
        let caps = capabilities
            .iter()
            .map(|c| CapabilityId::new(*c).unwrap())
            .collect::<Vec<_>>();
        AgentSnapshot::builder(agent_type)
            .capabilities(caps)
            .state(serde_json::json!({ "counter": 0 }))
            .unwrap()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn register_then_get_round_trips() {
        let registry = registry();
        let snapshot = snapshot_with("demo", &["ping"]);
        let id = snapshot.id();
        let (sentinel, watch) = LivenessSentinel::pair();

        registry
            .register(snapshot.clone(), WorkerHandle::new(()), watch)
            .await
            .unwrap();

        let fetched = registry.get_agent(id).await.unwrap();
        assert_eq!(fetched.id(), id);

        drop(sentinel);
    }

    #[tokio::test]
    async fn duplicate_register_errors() {
        let registry = registry();
        let snapshot = snapshot_with("demo", &[]);
        let (s1, w1) = LivenessSentinel::pair();
        registry
            .register(snapshot.clone(), WorkerHandle::new(()), w1)
            .await
            .unwrap();

        let (_s2, w2) = LivenessSentinel::pair();
        let err = registry
            .register(snapshot, WorkerHandle::new(()), w2)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered { .. }));
        drop(s1);
    }

    #[tokio::test]
    async fn find_by_type_and_capability() {
        let registry = registry();
        let snapshot = snapshot_with("demo", &["ping"]);
        let id = snapshot.id();
        let (sentinel, watch) = LivenessSentinel::pair();
        registry
            .register(snapshot, WorkerHandle::new(()), watch)
            .await
            .unwrap();

        let by_type = registry.find_by_type("demo").await.unwrap();
        assert!(by_type.iter().any(|s| s.id() == id));

        let by_cap = registry
            .find_by_capability(CapabilityId::new("ping").unwrap())
            .await
            .unwrap();
        assert!(by_cap.iter().any(|s| s.id() == id));

        drop(sentinel);
    }

    #[tokio::test]
    async fn update_agent_commits_monotonic_version() {
        let registry = registry();
        let snapshot = snapshot_with("demo", &[]);
        let id = snapshot.id();
        let (sentinel, watch) = LivenessSentinel::pair();
        registry
            .register(snapshot, WorkerHandle::new(()), watch)
            .await
            .unwrap();

        let updated = registry
            .update_agent(id, |current| {
                Ok(current.committed(serde_json::json!({ "counter": 5 }), Lifecycle::Ready))
            })
            .await
            .unwrap();

        assert_eq!(updated.version(), 1);
        assert_eq!(registry.get_agent(id).await.unwrap().version(), 1);
        drop(sentinel);
    }

    #[tokio::test]
    async fn failing_transform_leaves_registration_untouched() {
        let registry = registry();
        let snapshot = snapshot_with("demo", &[]);
        let id = snapshot.id();
        let (sentinel, watch) = LivenessSentinel::pair();
        registry
            .register(snapshot, WorkerHandle::new(()), watch)
            .await
            .unwrap();

        let err = registry
            .update_agent(id, |_| Err("boom".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::TransformFailed { .. }));
        assert_eq!(registry.get_agent(id).await.unwrap().version(), 0);
        drop(sentinel);
    }

    #[tokio::test]
    async fn panicking_transform_leaves_registration_untouched() {
        let registry = registry();
        let snapshot = snapshot_with("demo", &[]);
        let id = snapshot.id();
        let (sentinel, watch) = LivenessSentinel::pair();
        registry
            .register(snapshot, WorkerHandle::new(()), watch)
            .await
            .unwrap();

        let err = registry
            .update_agent(id, |_| panic!("simulated transform crash"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::TransformFailed { .. }));
        assert_eq!(registry.get_agent(id).await.unwrap().version(), 0);
        drop(sentinel);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let registry = registry();
        let snapshot = snapshot_with("demo", &[]);
        let id = snapshot.id();

        registry.unregister(id).await.unwrap();
        registry.unregister(id).await.unwrap();

        let err = registry.get_agent(id).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn worker_death_deregisters_and_clears_indices() {
        let registry = registry();
        let snapshot = snapshot_with("demo", &["ping"]);
        let id = snapshot.id();
        let (sentinel, watch) = LivenessSentinel::pair();
        registry
            .register(snapshot, WorkerHandle::new(()), watch)
            .await
            .unwrap();

        drop(sentinel);
        // Give the watchdog task a turn to observe the death and deregister.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let err = registry.get_agent(id).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));

        let by_type = registry.find_by_type("demo").await.unwrap();
        assert!(by_type.is_empty());
    }

    #[tokio::test]
    async fn worker_death_emits_agent_terminated() {
        let bus = EventBus::new(agent_bus::BusConfig::default());
        let registry = Registry::with_bus(RegistryConfig::default(), bus.clone());
        let snapshot = snapshot_with("demo", &[]);
        let id = snapshot.id();

        let (bus_sentinel, bus_watch) = LivenessSentinel::pair();
        let (subscriber_id, mut events) = bus.subscriber(bus_watch).await.unwrap();
        bus.subscribe(subscriber_id, topics::AGENT_TERMINATED).await.unwrap();

        let (sentinel, watch) = LivenessSentinel::pair();
        registry
            .register(snapshot, WorkerHandle::new(()), watch)
            .await
            .unwrap();

        drop(sentinel);

        let event = events.recv().await.expect("agent_terminated event");
        assert_eq!(event.topic(), topics::AGENT_TERMINATED);
        assert_eq!(event.data()["agent_id"], id.to_string());

        drop(bus_sentinel);
    }
}
