//! Inputs to [`crate::Supervisor::start_agent`] and
//! [`crate::Supervisor::restart_agent`].

use std::sync::Arc;

use agent_kernel::AgentBehavior;
use agent_primitives::{AgentId, CapabilityId};
use serde_json::Value;

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Everything needed to start a new agent.
pub struct StartSpec {
    pub(crate) id: Option<AgentId>,
    pub(crate) agent_type: String,
    pub(crate) capabilities: Vec<CapabilityId>,
    pub(crate) initial_state: Value,
    pub(crate) parent_id: Option<AgentId>,
    pub(crate) metadata: Value,
    pub(crate) behavior: Arc<dyn AgentBehavior>,
    pub(crate) init_config: Value,
    pub(crate) topics: Vec<String>,
    pub(crate) patterns: Vec<String>,
}

impl StartSpec {
    /// Starts a spec for an agent of `agent_type`, dispatching callbacks to `behavior`.
    #[must_use]
    pub fn new(agent_type: impl Into<String>, behavior: Arc<dyn AgentBehavior>) -> Self {
        Self {
            id: None,
            agent_type: agent_type.into(),
            capabilities: Vec::new(),
            initial_state: empty_object(),
            parent_id: None,
            metadata: empty_object(),
            behavior,
            init_config: Value::Null,
            topics: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Sets the capability set advertised in the registry.
    #[must_use]
    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = CapabilityId>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    /// Sets the pre-`init` state. Must be a JSON object.
    #[must_use]
    pub fn initial_state(mut self, state: Value) -> Self {
        self.initial_state = state;
        self
    }

    /// Records the creator agent, if any.
    #[must_use]
    pub fn parent_id(mut self, parent_id: AgentId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets metadata stored on the snapshot (conventionally includes `module`).
    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the value passed to the behavior's `init` callback.
    #[must_use]
    pub fn init_config(mut self, config: Value) -> Self {
        self.init_config = config;
        self
    }

    /// Subscribes the worker to these exact topics before it accepts its first command.
    #[must_use]
    pub fn topics(mut self, topics: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Subscribes the worker to these glob patterns before it accepts its first command.
    #[must_use]
    pub fn patterns(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Preserves a specific agent id instead of minting a random one. Used by
    /// `restart_agent` so the restarted agent keeps its original identity.
    #[must_use]
    pub(crate) fn with_id(mut self, id: AgentId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Overrides supplied to [`crate::Supervisor::restart_agent`].
///
/// Fields left unset fall back to the stopped agent's last snapshot, except
/// `behavior`/`init_config`/`topics`/`patterns`, which the caller must always
/// supply: a callback implementation cannot be recovered from a snapshot alone.
pub struct RestartOverrides {
    pub(crate) behavior: Arc<dyn AgentBehavior>,
    pub(crate) init_config: Value,
    pub(crate) topics: Vec<String>,
    pub(crate) patterns: Vec<String>,
    pub(crate) agent_type: Option<String>,
    pub(crate) capabilities: Option<Vec<CapabilityId>>,
    pub(crate) initial_state: Option<Value>,
    pub(crate) metadata: Option<Value>,
}

impl RestartOverrides {
    /// Starts a set of restart overrides dispatching callbacks to `behavior`.
    #[must_use]
    pub fn new(behavior: Arc<dyn AgentBehavior>) -> Self {
        Self {
            behavior,
            init_config: Value::Null,
            topics: Vec::new(),
            patterns: Vec::new(),
            agent_type: None,
            capabilities: None,
            initial_state: None,
            metadata: None,
        }
    }

    /// Sets the value passed to the behavior's `init` callback.
    #[must_use]
    pub fn init_config(mut self, config: Value) -> Self {
        self.init_config = config;
        self
    }

    /// Subscribes the new worker to these exact topics.
    #[must_use]
    pub fn topics(mut self, topics: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Subscribes the new worker to these glob patterns.
    #[must_use]
    pub fn patterns(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the agent type tag; defaults to the stopped agent's type.
    #[must_use]
    pub fn agent_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent_type = Some(agent_type.into());
        self
    }

    /// Overrides the capability set; defaults to the stopped agent's capabilities.
    #[must_use]
    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = CapabilityId>) -> Self {
        self.capabilities = Some(capabilities.into_iter().collect());
        self
    }

    /// Overrides the pre-`init` state; defaults to the stopped agent's last state.
    #[must_use]
    pub fn initial_state(mut self, state: Value) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Overrides metadata; defaults to the stopped agent's metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
