//! The registry's actor loop: a single task owning all registry state.
//!
//! Serialization is structural — the mailbox is a `tokio::sync::mpsc` channel
//! and exactly one task ever touches the maps below — rather than enforced by
//! a lock, matching the FIFO-per-singleton guarantee required of the
//! registry.

use std::collections::{BTreeSet, HashMap};

use agent_bus::EventBus;
use agent_primitives::{AgentId, AgentSnapshot, CapabilityId};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::command::Command;
use crate::error::RegistryError;
use crate::record::RegistrationRecord;

struct State {
    registrations: HashMap<AgentId, RegistrationRecord>,
    by_type: HashMap<String, BTreeSet<AgentId>>,
    by_capability: HashMap<CapabilityId, BTreeSet<AgentId>>,
    bus: Option<EventBus>,
}

impl State {
    fn insert_indices(&mut self, id: AgentId, snapshot: &AgentSnapshot) {
        self.by_type
            .entry(snapshot.agent_type().to_owned())
            .or_default()
            .insert(id);
        for capability in snapshot.capabilities() {
            self.by_capability
                .entry(capability.clone())
                .or_default()
                .insert(id);
        }
    }

    fn remove_indices(&mut self, id: AgentId, snapshot: &AgentSnapshot) {
        if let Some(set) = self.by_type.get_mut(snapshot.agent_type()) {
            set.remove(&id);
            if set.is_empty() {
                self.by_type.remove(snapshot.agent_type());
            }
        }
        for capability in snapshot.capabilities() {
            if let Some(set) = self.by_capability.get_mut(capability) {
                set.remove(&id);
                if set.is_empty() {
                    self.by_capability.remove(capability);
                }
            }
        }
    }

    fn remove_registration(&mut self, id: AgentId) -> Option<RegistrationRecord> {
        let record = self.registrations.remove(&id)?;
        self.remove_indices(id, &record.agent_snapshot);
        Some(record)
    }
}

pub(crate) async fn run(mut mailbox: mpsc::Receiver<Command>, self_tx: mpsc::Sender<Command>, bus: Option<EventBus>) {
    let mut state = State {
        registrations: HashMap::new(),
        by_type: HashMap::new(),
        by_capability: HashMap::new(),
        bus,
    };

    while let Some(command) = mailbox.recv().await {
        handle_command(&mut state, command, &self_tx);
    }
}

fn handle_command(state: &mut State, command: Command, self_tx: &mpsc::Sender<Command>) {
    match command {
        Command::Register {
            snapshot,
            worker_handle,
            watch,
            reply,
        } => {
            let agent_id = snapshot.id();
            let result = if state.registrations.contains_key(&agent_id) {
                Err(RegistryError::AlreadyRegistered { agent_id })
            } else {
                let now = chrono::Utc::now();
                state.insert_indices(agent_id, &snapshot);
                state.registrations.insert(
                    agent_id,
                    RegistrationRecord {
                        worker_handle,
                        agent_snapshot: snapshot,
                        registered_at: now,
                        last_seen: now,
                    },
                );
                spawn_watchdog(agent_id, watch, self_tx.clone());
                info!(%agent_id, "agent registered");
                Ok(())
            };
            let _ = reply.send(result);
        }

        Command::GetAgent { agent_id, reply } => {
            let result = state
                .registrations
                .get(&agent_id)
                .map(|record| record.agent_snapshot.clone())
                .ok_or(RegistryError::NotFound { agent_id });
            let _ = reply.send(result);
        }

        Command::GetWorker { agent_id, reply } => {
            let result = state
                .registrations
                .get(&agent_id)
                .map(|record| record.worker_handle.clone())
                .ok_or(RegistryError::NotFound { agent_id });
            let _ = reply.send(result);
        }

        Command::UpdateAgent {
            agent_id,
            transform,
            reply,
        } => {
            let result = apply_transform(state, agent_id, transform);
            let _ = reply.send(result);
        }

        Command::FindByType { agent_type, reply } => {
            let snapshots = state
                .by_type
                .get(&agent_type)
                .into_iter()
                .flatten()
                .filter_map(|id| state.registrations.get(id))
                .map(|record| record.agent_snapshot.clone())
                .collect();
            let _ = reply.send(snapshots);
        }

        Command::FindByCapability { capability, reply } => {
            let snapshots = state
                .by_capability
                .get(&capability)
                .into_iter()
                .flatten()
                .filter_map(|id| state.registrations.get(id))
                .map(|record| record.agent_snapshot.clone())
                .collect();
            let _ = reply.send(snapshots);
        }

        Command::ListAll { reply } => {
            let snapshots = state
                .registrations
                .values()
                .map(|record| record.agent_snapshot.clone())
                .collect();
            let _ = reply.send(snapshots);
        }

        Command::Unregister { agent_id, reply } => {
            if state.remove_registration(agent_id).is_some() {
                info!(%agent_id, "agent unregistered");
            }
            let _ = reply.send(());
        }

        Command::WorkerDied { agent_id } => {
            if state.remove_registration(agent_id).is_some() {
                warn!(%agent_id, "worker died; deregistering");
                if let Some(bus) = state.bus.clone() {
                    emit_agent_terminated(bus, agent_id);
                }
            }
        }
    }
}

fn apply_transform(
    state: &mut State,
    agent_id: AgentId,
    transform: crate::command::Transform,
) -> Result<AgentSnapshot, RegistryError> {
    let Some(record) = state.registrations.get(&agent_id) else {
        return Err(RegistryError::NotFound { agent_id });
    };

    let old_version = record.agent_snapshot.version();
    let current = record.agent_snapshot.clone();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| transform(&current)));

    let new_snapshot = match outcome {
        Ok(Ok(snapshot)) => snapshot,
        Ok(Err(reason)) => return Err(RegistryError::TransformFailed { agent_id, reason }),
        Err(_) => {
            return Err(RegistryError::TransformFailed {
                agent_id,
                reason: "transform panicked".to_string(),
            });
        }
    };

    if new_snapshot.version() != old_version + 1 {
        return Err(RegistryError::TransformFailed {
            agent_id,
            reason: format!(
                "transform produced version {} but expected {}",
                new_snapshot.version(),
                old_version + 1
            ),
        });
    }

    let record = state.registrations.get(&agent_id).expect("checked above");
    state.remove_indices(agent_id, &record.agent_snapshot);
    state.insert_indices(agent_id, &new_snapshot);

    let record = state
        .registrations
        .get_mut(&agent_id)
        .expect("checked above");
    record.agent_snapshot = new_snapshot.clone();
    record.last_seen = chrono::Utc::now();

    Ok(new_snapshot)
}

fn emit_agent_terminated(bus: EventBus, agent_id: AgentId) {
    tokio::spawn(async move {
        let payload = json!({ "agent_id": agent_id.to_string() });
        if let Err(err) = bus
            .emit(crate::topics::AGENT_TERMINATED, payload, serde_json::Value::Null, None)
            .await
        {
            warn!(%agent_id, %err, "failed to emit agent_terminated event");
        }
    });
}

fn spawn_watchdog(
    agent_id: AgentId,
    watch: agent_primitives::LivenessWatch,
    self_tx: mpsc::Sender<Command>,
) {
    tokio::spawn(async move {
        watch.died().await;
        let _ = self_tx.send(Command::WorkerDied { agent_id }).await;
    });
}
