//! Sum type of requests accepted by the registry actor's mailbox.

use agent_primitives::{AgentId, AgentSnapshot, CapabilityId, LivenessWatch, WorkerHandle};
use tokio::sync::oneshot;

use crate::error::RegistryResult;

/// A user-supplied transform applied to the current snapshot by `update_agent`.
///
/// Runs inline on the actor task, never across an `.await`, so it cannot
/// itself block on I/O.
pub type Transform =
    Box<dyn FnOnce(&AgentSnapshot) -> Result<AgentSnapshot, String> + Send + 'static>;

pub(crate) enum Command {
    Register {
        snapshot: AgentSnapshot,
        worker_handle: WorkerHandle,
        watch: LivenessWatch,
        reply: oneshot::Sender<RegistryResult<()>>,
    },
    GetAgent {
        agent_id: AgentId,
        reply: oneshot::Sender<RegistryResult<AgentSnapshot>>,
    },
    GetWorker {
        agent_id: AgentId,
        reply: oneshot::Sender<RegistryResult<WorkerHandle>>,
    },
    UpdateAgent {
        agent_id: AgentId,
        transform: Transform,
        reply: oneshot::Sender<RegistryResult<AgentSnapshot>>,
    },
    FindByType {
        agent_type: String,
        reply: oneshot::Sender<Vec<AgentSnapshot>>,
    },
    FindByCapability {
        capability: CapabilityId,
        reply: oneshot::Sender<Vec<AgentSnapshot>>,
    },
    ListAll {
        reply: oneshot::Sender<Vec<AgentSnapshot>>,
    },
    Unregister {
        agent_id: AgentId,
        reply: oneshot::Sender<()>,
    },
    /// Fed by a per-registration watchdog task once the worker's liveness
    /// watch resolves. Carries no reply channel.
    WorkerDied {
        agent_id: AgentId,
    },
}
