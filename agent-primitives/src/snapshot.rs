//! Agent snapshot: the externally visible description of an agent at an instant.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::CapabilityId;
use crate::error::{Error, Result};
use crate::ids::AgentId;

/// Lifecycle stage an agent snapshot currently occupies.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Snapshot constructed but `init` has not yet completed.
    Initializing,
    /// `init` completed successfully; the agent accepts actions, messages, and signals.
    Ready,
    /// The lifecycle controller has requested shutdown; the worker is draining.
    Terminating,
    /// Terminal state. Never observed externally: the registration is removed
    /// before a worker reaches it.
    Stopped,
}

impl Lifecycle {
    /// Returns `true` for `Ready` and `Terminating`, the only states a caller
    /// can observe through the registry (`initializing` and `stopped` are
    /// transient or post-removal).
    #[must_use]
    pub const fn is_observable(self) -> bool {
        matches!(self, Self::Ready | Self::Terminating)
    }
}

/// Immutable, externally visible description of an agent at one instant.
///
/// Every mutation produces a new `AgentSnapshot` via [`AgentSnapshot::committed`];
/// the previous value is never modified in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentSnapshot {
    id: AgentId,
    #[serde(rename = "type")]
    agent_type: String,
    capabilities: BTreeSet<CapabilityId>,
    lifecycle: Lifecycle,
    state: Value,
    version: u64,
    parent_id: Option<AgentId>,
    metadata: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AgentSnapshot {
    /// Starts building the initial snapshot for a freshly constructed agent.
    #[must_use]
    pub fn builder(agent_type: impl Into<String>) -> AgentSnapshotBuilder {
        AgentSnapshotBuilder {
            id: None,
            agent_type: agent_type.into(),
            capabilities: BTreeSet::new(),
            state: Value::Object(serde_json::Map::new()),
            parent_id: None,
            metadata: Value::Object(serde_json::Map::new()),
        }
    }

    /// Returns the agent's identifier.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Returns the symbolic type tag chosen by the starter.
    #[must_use]
    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    /// Returns the set of capability tags advertised by this agent.
    #[must_use]
    pub fn capabilities(&self) -> &BTreeSet<CapabilityId> {
        &self.capabilities
    }

    /// Returns the current lifecycle stage.
    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Returns the opaque user-defined state.
    #[must_use]
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Returns the monotonic version counter.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the parent agent, if this agent was spawned by another.
    #[must_use]
    pub const fn parent_id(&self) -> Option<AgentId> {
        self.parent_id
    }

    /// Returns user/runtime metadata, conventionally holding at least `module`.
    #[must_use]
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the timestamp of the most recent commit.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Produces a new snapshot reflecting a committed mutation: `version` is
    /// incremented by exactly one and `updated_at` is refreshed. This is the
    /// only way an `AgentSnapshot` changes.
    #[must_use]
    pub fn committed(&self, state: Value, lifecycle: Lifecycle) -> Self {
        Self {
            state,
            lifecycle,
            version: self.version + 1,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Produces a new snapshot with only the lifecycle stage changed, state
    /// left untouched. Used to mark `terminating` without a user callback.
    #[must_use]
    pub fn with_lifecycle(&self, lifecycle: Lifecycle) -> Self {
        self.committed(self.state.clone(), lifecycle)
    }
}

/// Builder for the initial [`AgentSnapshot`] of a newly started agent.
#[derive(Debug)]
pub struct AgentSnapshotBuilder {
    id: Option<AgentId>,
    agent_type: String,
    capabilities: BTreeSet<CapabilityId>,
    state: Value,
    parent_id: Option<AgentId>,
    metadata: Value,
}

impl AgentSnapshotBuilder {
    /// Overrides the generated identifier, keeping a caller-supplied one
    /// instead. Used when restarting an agent that must keep its prior id.
    #[must_use]
    pub fn id(mut self, id: AgentId) -> Self {
        self.id = Some(id);
        self
    }

    /// Replaces the capability set.
    #[must_use]
    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = CapabilityId>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    /// Sets the initial user-defined state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSnapshot`] unless `state` is a JSON object.
    pub fn state(mut self, state: Value) -> Result<Self> {
        if !state.is_object() {
            return Err(Error::InvalidSnapshot {
                reason: "state must be a JSON object".into(),
            });
        }
        self.state = state;
        Ok(self)
    }

    /// Records the creator agent, if any.
    #[must_use]
    pub fn parent_id(mut self, parent_id: AgentId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets metadata. The lifecycle controller injects `module` automatically;
    /// callers need not add it themselves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSnapshot`] unless `metadata` is a JSON object.
    pub fn metadata(mut self, metadata: Value) -> Result<Self> {
        if !metadata.is_object() {
            return Err(Error::InvalidSnapshot {
                reason: "metadata must be a JSON object".into(),
            });
        }
        self.metadata = metadata;
        Ok(self)
    }

    /// Finalizes the snapshot with `lifecycle = initializing` and `version = 0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSnapshot`] if `agent_type` is empty.
    pub fn build(self) -> Result<AgentSnapshot> {
        if self.agent_type.trim().is_empty() {
            return Err(Error::InvalidSnapshot {
                reason: "agent type cannot be empty".into(),
            });
        }

        let now = Utc::now();
        Ok(AgentSnapshot {
            id: self.id.unwrap_or_else(AgentId::random),
            agent_type: self.agent_type,
            capabilities: self.capabilities,
            lifecycle: Lifecycle::Initializing,
            state: self.state,
            version: 0,
            parent_id: self.parent_id,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        })
    }
}
