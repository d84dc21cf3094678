//! End-to-end lifecycle scenarios exercising `Supervisor` over a real
//! `Registry` and `EventBus`, without any mocked collaborator.

use std::sync::Arc;

use agent_bus::BusConfig;
use agent_kernel::{ActionOutcome, AgentBehavior};
use agent_primitives::{AgentSnapshot, CapabilityId, Lifecycle};
use agent_registry::RegistryConfig;
use agent_registry::{Registry, RegistryError};
use agent_supervisor::{RestartOverrides, StartSpec, Supervisor};
use async_trait::async_trait;
use serde_json::json;

struct CounterAgent;

#[async_trait]
impl AgentBehavior for CounterAgent {
    async fn init(&self, snapshot: &AgentSnapshot, _config: &serde_json::Value) -> Result<serde_json::Value, String> {
        Ok(snapshot.state().clone())
    }

    async fn handle_action(
        &self,
        snapshot: &AgentSnapshot,
        action: &str,
        params: &serde_json::Value,
    ) -> ActionOutcome {
        if action != "increment" {
            return ActionOutcome::rejected(format!("unknown_action: {action}"));
        }
        let amount = params["amount"].as_i64().unwrap_or(0);
        let counter = snapshot.state()["counter"].as_i64().unwrap_or(0) + amount;
        ActionOutcome::ok(
            json!({ "counter": counter }),
            json!({ "counter": counter, "incremented_by": amount }),
        )
    }
}

fn supervisor() -> Supervisor {
    let bus = agent_bus::EventBus::new(BusConfig::default());
    let registry = Registry::with_bus(RegistryConfig::default(), bus.clone());
    Supervisor::new(registry, bus)
}

fn demo_spec() -> StartSpec {
    StartSpec::new("demo", Arc::new(CounterAgent))
        .capabilities([CapabilityId::new("ping").unwrap()])
        .initial_state(json!({ "counter": 0 }))
}

#[tokio::test]
async fn seed_scenario_1_identity() {
    let supervisor = supervisor();
    let handle = supervisor.start_agent(demo_spec()).await.unwrap();
    let agent_id = handle.agent_id();

    let snapshot = supervisor.registry().get_agent(agent_id).await.unwrap();
    assert_eq!(snapshot.agent_type(), "demo");
    assert_eq!(
        snapshot.capabilities().iter().map(CapabilityId::as_str).collect::<Vec<_>>(),
        vec!["ping"]
    );
    assert_eq!(snapshot.state()["counter"], 0);
    assert_eq!(snapshot.lifecycle(), Lifecycle::Ready);
    assert_eq!(snapshot.version(), 1);

    let by_type = supervisor.registry().find_by_type("demo").await.unwrap();
    assert!(by_type.iter().any(|s| s.id() == agent_id));

    let by_capability = supervisor
        .registry()
        .find_by_capability(CapabilityId::new("ping").unwrap())
        .await
        .unwrap();
    assert!(by_capability.iter().any(|s| s.id() == agent_id));
}

#[tokio::test]
async fn seed_scenario_2_action_round_trip() {
    let supervisor = supervisor();
    let handle = supervisor.start_agent(demo_spec()).await.unwrap();

    let result = handle
        .execute_action("increment", json!({ "amount": 5 }), None)
        .await
        .unwrap();
    assert_eq!(result["counter"], 5);
    assert_eq!(result["incremented_by"], 5);

    let snapshot = supervisor.registry().get_agent(handle.agent_id()).await.unwrap();
    assert_eq!(snapshot.state()["counter"], 5);
    assert_eq!(snapshot.version(), 2);
}

#[tokio::test]
async fn seed_scenario_3_stop_then_lookup() {
    let supervisor = supervisor();
    let handle = supervisor.start_agent(demo_spec()).await.unwrap();
    let agent_id = handle.agent_id();

    supervisor.stop_agent(agent_id, "scenario 3").await.unwrap();

    let err = supervisor.registry().get_agent(agent_id).await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound { .. }));

    let all = supervisor.registry().list_all().await.unwrap();
    assert!(!all.iter().any(|s| s.id() == agent_id));
}

#[tokio::test]
async fn stop_agent_is_idempotent() {
    let supervisor = supervisor();
    let handle = supervisor.start_agent(demo_spec()).await.unwrap();
    let agent_id = handle.agent_id();

    supervisor.stop_agent(agent_id, "first").await.unwrap();
    supervisor.stop_agent(agent_id, "second").await.unwrap();
}

#[tokio::test]
async fn restart_preserves_id_and_last_committed_state() {
    let supervisor = supervisor();
    let handle = supervisor.start_agent(demo_spec()).await.unwrap();
    let agent_id = handle.agent_id();
    handle
        .execute_action("increment", json!({ "amount": 7 }), None)
        .await
        .unwrap();

    let restarted = supervisor
        .restart_agent(agent_id, RestartOverrides::new(Arc::new(CounterAgent)))
        .await
        .unwrap();

    assert_eq!(restarted.agent_id(), agent_id);
    let snapshot = supervisor.registry().get_agent(agent_id).await.unwrap();
    assert_eq!(snapshot.state()["counter"], 7);
    assert_eq!(snapshot.lifecycle(), Lifecycle::Ready);
}

#[tokio::test]
async fn update_agent_transform_failure_leaves_state_untouched() {
    let supervisor = supervisor();
    let handle = supervisor.start_agent(demo_spec()).await.unwrap();

    let err = handle
        .update_agent(|_| Err("simulated rejection".to_string()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, agent_kernel::KernelError::TransformFailed { .. }));

    let snapshot = supervisor.registry().get_agent(handle.agent_id()).await.unwrap();
    assert_eq!(snapshot.state()["counter"], 0);
    assert_eq!(snapshot.version(), 1);
}
