//! Stateless lifecycle controller: the only component allowed to start,
//! stop, or restart an agent.
//!
//! A [`Supervisor`] holds no per-agent state of its own — every fact about a
//! running agent lives in [`agent_registry::Registry`], reachable through its
//! own actor mailbox. `start_agent`/`stop_agent`/`restart_agent` are plain
//! async functions over that registry, [`agent_bus::EventBus`], and
//! [`agent_kernel::spawn`]; cloning a `Supervisor` is cheap and every clone is
//! interchangeable, the same way cloning a `Registry` or `EventBus` is.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod spec;
pub mod topics;

use std::sync::Arc;

use agent_bus::EventBus;
use agent_kernel::{AgentHandle, WorkerConfig};
use agent_primitives::{AgentId, AgentSnapshot, Lifecycle, WorkerHandle};
use agent_registry::{Registry, RegistryError};
use serde_json::Value;
use tracing::{info, warn};

pub use error::{SupervisorError, SupervisorResult};
pub use spec::{RestartOverrides, StartSpec};

/// Orchestrates the registry, event bus, and per-agent workers.
///
/// Cheaply `Clone`able: every clone shares the same registry and bus handles.
#[derive(Clone)]
pub struct Supervisor {
    registry: Registry,
    bus: EventBus,
    worker_config: WorkerConfig,
}

impl Supervisor {
    /// Builds a controller over `registry` and `bus`, using the default
    /// worker mailbox configuration for every agent it starts.
    #[must_use]
    pub fn new(registry: Registry, bus: EventBus) -> Self {
        Self::with_worker_config(registry, bus, WorkerConfig::default())
    }

    /// Builds a controller that spawns every worker with `worker_config`.
    #[must_use]
    pub fn with_worker_config(registry: Registry, bus: EventBus, worker_config: WorkerConfig) -> Self {
        Self {
            registry,
            bus,
            worker_config,
        }
    }

    /// Returns the registry this controller orchestrates.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the event bus this controller orchestrates.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Starts a new agent: builds its initial snapshot, spawns its worker,
    /// registers it, runs `init`, and emits `agent_lifecycle.started`.
    ///
    /// Any failure before registration completes is reported as
    /// [`SupervisorError::StartFailed`] or [`SupervisorError::RegistrationFailed`]
    /// and `agent_lifecycle.start_failed` is emitted best-effort; no
    /// registration is left behind.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::StartFailed`] if the snapshot is invalid or
    /// the worker fails to spawn or `init`, [`SupervisorError::RegistrationFailed`]
    /// if the registry rejects the registration (for example a duplicate id),
    /// or a wrapped bus/registry error if the actor mailbox itself is closed.
    pub async fn start_agent(&self, spec: StartSpec) -> SupervisorResult<AgentHandle> {
        let snapshot = self.build_snapshot(&spec).map_err(|reason| SupervisorError::StartFailed { reason })?;
        let agent_id = snapshot.id();

        let spawn_result = agent_kernel::spawn(
            snapshot.clone(),
            spec.behavior,
            self.registry.clone(),
            self.bus.clone(),
            spec.topics,
            spec.patterns,
            self.worker_config.clone(),
        )
        .await;

        let (handle, watch) = match spawn_result {
            Ok(pair) => pair,
            Err(err) => {
                self.emit_start_failed(agent_id, &err.to_string()).await;
                return Err(SupervisorError::StartFailed {
                    reason: err.to_string(),
                });
            }
        };

        if let Err(err) = self
            .registry
            .register(snapshot, WorkerHandle::new(handle.clone()), watch)
            .await
        {
            let reason = err.to_string();
            let _ = handle.terminate("registration_failed").await;
            self.emit_start_failed(agent_id, &reason).await;
            return Err(SupervisorError::RegistrationFailed { reason });
        }

        if let Err(err) = handle.init(spec.init_config).await {
            let reason = err.to_string();
            let _ = handle.terminate("init_failed").await;
            let _ = self.registry.unregister(agent_id).await;
            self.emit_start_failed(agent_id, &reason).await;
            return Err(SupervisorError::StartFailed { reason });
        }

        info!(%agent_id, agent_type = %spec.agent_type, "agent started");
        self.emit(topics::AGENT_LIFECYCLE_STARTED, agent_id, Value::Null).await;
        Ok(handle)
    }

    /// Stops a running agent: marks it `terminating`, runs the worker's
    /// `terminate` callback, and removes its registration.
    ///
    /// Idempotent: an `agent_id` with no current registration succeeds
    /// silently, matching [`agent_registry::Registry::unregister`].
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`agent_registry::RegistryError`] only if the
    /// registry's own mailbox is closed.
    pub async fn stop_agent(&self, agent_id: AgentId, reason: impl Into<String> + Send) -> SupervisorResult<()> {
        let reason = reason.into();

        let worker = match self.registry.get_worker(agent_id).await {
            Ok(worker) => worker,
            Err(RegistryError::NotFound { .. }) => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        if let Err(err) = self
            .registry
            .update_agent(agent_id, |snapshot| Ok(snapshot.with_lifecycle(Lifecycle::Terminating)))
            .await
        {
            warn!(%agent_id, %err, "could not mark agent terminating before stop");
        }
        self.emit(topics::AGENT_LIFECYCLE_STOPPING, agent_id, Value::Null).await;

        if let Some(handle) = worker.downcast::<AgentHandle>() {
            if let Err(err) = handle.terminate(reason).await {
                warn!(%agent_id, %err, "worker did not terminate cleanly");
            }
        }

        self.registry.unregister(agent_id).await?;
        info!(%agent_id, "agent stopped");
        self.emit(topics::AGENT_LIFECYCLE_STOPPED, agent_id, Value::Null).await;
        Ok(())
    }

    /// Stops the agent at `agent_id` and starts a replacement that keeps the
    /// same id. Fields left unset on `overrides` default to the stopped
    /// agent's last snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::NotFound`] if `agent_id` has no current
    /// registration, or any error `start_agent` can return.
    pub async fn restart_agent(&self, agent_id: AgentId, overrides: RestartOverrides) -> SupervisorResult<AgentHandle> {
        let previous = self
            .registry
            .get_agent(agent_id)
            .await
            .map_err(|_| SupervisorError::NotFound { agent_id })?;

        self.stop_agent(agent_id, "restart").await?;

        let mut start_spec = StartSpec::new(
            overrides.agent_type.unwrap_or_else(|| previous.agent_type().to_string()),
            overrides.behavior,
        )
        .capabilities(overrides.capabilities.unwrap_or_else(|| previous.capabilities().iter().cloned().collect()))
        .initial_state(overrides.initial_state.unwrap_or_else(|| previous.state().clone()))
        .metadata(overrides.metadata.unwrap_or_else(|| previous.metadata().clone()))
        .init_config(overrides.init_config)
        .topics(overrides.topics)
        .patterns(overrides.patterns)
        .with_id(agent_id);

        if let Some(parent_id) = previous.parent_id() {
            start_spec = start_spec.parent_id(parent_id);
        }

        self.start_agent(start_spec).await
    }

    fn build_snapshot(&self, spec: &StartSpec) -> Result<AgentSnapshot, String> {
        let mut metadata = spec.metadata.clone();
        if let Some(map) = metadata.as_object_mut() {
            map.entry("module")
                .or_insert_with(|| Value::String(spec.agent_type.clone()));
        }
        let mut builder = AgentSnapshot::builder(spec.agent_type.clone())
            .capabilities(spec.capabilities.clone())
            .state(spec.initial_state.clone())
            .map_err(|err| err.to_string())?
            .metadata(metadata)
            .map_err(|err| err.to_string())?;
        if let Some(id) = spec.id {
            builder = builder.id(id);
        }
        if let Some(parent_id) = spec.parent_id {
            builder = builder.parent_id(parent_id);
        }
        builder.build().map_err(|err| err.to_string())
    }

    async fn emit(&self, topic: &str, agent_id: AgentId, data: Value) {
        let payload = serde_json::json!({ "agent_id": agent_id, "data": data });
        if let Err(err) = self.bus.emit(topic, payload, Value::Null, None).await {
            warn!(%agent_id, %topic, %err, "failed to emit lifecycle event");
        }
    }

    async fn emit_start_failed(&self, agent_id: AgentId, reason: &str) {
        self.emit(
            topics::AGENT_LIFECYCLE_START_FAILED,
            agent_id,
            serde_json::json!({ "reason": reason }),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_bus::BusConfig;
    use agent_kernel::{ActionOutcome, AgentBehavior};
    use agent_primitives::CapabilityId;
    use agent_registry::RegistryConfig;
    use async_trait::async_trait;

    struct CounterBehavior;

    #[async_trait]
    impl AgentBehavior for CounterBehavior {
        async fn init(&self, snapshot: &AgentSnapshot, _config: &Value) -> Result<Value, String> {
            Ok(snapshot.state().clone())
        }

        async fn handle_action(
            &self,
            snapshot: &AgentSnapshot,
            action: &str,
            params: &Value,
        ) -> ActionOutcome {
            if action != "increment" {
                return ActionOutcome::rejected(format!("unknown_action: {action}"));
            }
            let step = params.get("by").and_then(Value::as_i64).unwrap_or(1);
            let current = snapshot.state()["counter"].as_i64().unwrap_or(0);
            let next = current + step;
            ActionOutcome::ok(
                serde_json::json!({ "counter": next }),
                serde_json::json!({ "counter": next }),
            )
        }
    }

    fn supervisor() -> Supervisor {
        let bus = EventBus::new(BusConfig::default());
        let registry = Registry::with_bus(RegistryConfig::default(), bus.clone());
        Supervisor::new(registry, bus)
    }

    fn start_spec(agent_type: &str) -> StartSpec {
        StartSpec::new(agent_type, Arc::new(CounterBehavior))
            .capabilities([CapabilityId::new("counter").unwrap()])
            .initial_state(serde_json::json!({ "counter": 0 }))
    }

    #[tokio::test]
    async fn start_agent_registers_and_reaches_ready() {
        let supervisor = supervisor();
        let handle = supervisor.start_agent(start_spec("counter")).await.unwrap();

        let snapshot = supervisor.registry().get_agent(handle.agent_id()).await.unwrap();
        assert_eq!(snapshot.lifecycle(), Lifecycle::Ready);
        assert_eq!(snapshot.state()["counter"], 0);
    }

    #[tokio::test]
    async fn execute_action_round_trips_through_the_registry() {
        let supervisor = supervisor();
        let handle = supervisor.start_agent(start_spec("counter")).await.unwrap();

        let result = handle
            .execute_action("increment", serde_json::json!({ "by": 5 }), None)
            .await
            .unwrap();
        assert_eq!(result["counter"], 5);

        let snapshot = supervisor.registry().get_agent(handle.agent_id()).await.unwrap();
        assert_eq!(snapshot.state()["counter"], 5);
    }

    #[tokio::test]
    async fn stop_agent_removes_the_registration() {
        let supervisor = supervisor();
        let handle = supervisor.start_agent(start_spec("counter")).await.unwrap();
        let agent_id = handle.agent_id();

        supervisor.stop_agent(agent_id, "test done").await.unwrap();

        let err = supervisor.registry().get_agent(agent_id).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn stop_agent_on_unknown_id_succeeds_silently() {
        let supervisor = supervisor();
        supervisor.stop_agent(AgentId::random(), "noop").await.unwrap();
    }

    #[tokio::test]
    async fn restart_agent_keeps_the_same_id_and_state_default() {
        let supervisor = supervisor();
        let handle = supervisor.start_agent(start_spec("counter")).await.unwrap();
        let agent_id = handle.agent_id();
        handle
            .execute_action("increment", serde_json::json!({ "by": 3 }), None)
            .await
            .unwrap();

        let restarted = supervisor
            .restart_agent(agent_id, RestartOverrides::new(Arc::new(CounterBehavior)))
            .await
            .unwrap();

        assert_eq!(restarted.agent_id(), agent_id);
        let snapshot = supervisor.registry().get_agent(agent_id).await.unwrap();
        assert_eq!(snapshot.state()["counter"], 3);
        assert_eq!(snapshot.lifecycle(), Lifecycle::Ready);
    }

    #[tokio::test]
    async fn restart_unknown_agent_is_not_found() {
        let supervisor = supervisor();
        let err = supervisor
            .restart_agent(AgentId::random(), RestartOverrides::new(Arc::new(CounterBehavior)))
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::NotFound { .. }));
    }
}
