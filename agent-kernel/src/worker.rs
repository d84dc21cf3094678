//! The per-agent worker: a single task serializing all access to one agent's snapshot.
//!
//! Two channels feed the worker: an ordered `mpsc::Sender<KernelCommand>` for
//! get/update/execute/message, and an unbounded signal channel. The select
//! loop below is `biased` toward signals, so a pending signal always runs
//! ahead of the next queued command — the concrete form of "signals:
//! immediate, no queueing" vs "messages: FIFO queued".

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use agent_bus::{Event, EventBus};
use agent_primitives::{AgentId, AgentSnapshot, LivenessSentinel, LivenessWatch, WorkerHandle};
use agent_registry::Registry;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::behavior::{ActionOutcome, AgentBehavior};
use crate::config::WorkerConfig;
use crate::envelope::Envelope;
use crate::error::{KernelError, KernelResult};

/// A user-supplied transform applied to the worker's current snapshot.
///
/// Runs inline on the worker task, protected against panics; it must not
/// perform blocking I/O.
pub type Transform = Box<dyn FnOnce(&AgentSnapshot) -> Result<AgentSnapshot, String> + Send + 'static>;

pub(crate) enum KernelCommand {
    Init {
        config: Value,
        reply: oneshot::Sender<KernelResult<AgentSnapshot>>,
    },
    GetAgent {
        reply: oneshot::Sender<AgentSnapshot>,
    },
    UpdateAgent {
        transform: Transform,
        reply: oneshot::Sender<KernelResult<AgentSnapshot>>,
    },
    ExecuteAction {
        action: String,
        params: Value,
        reply: oneshot::Sender<KernelResult<Value>>,
    },
    Message {
        envelope: Envelope,
    },
    Terminate {
        reason: String,
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running agent worker.
///
/// Cheaply `Clone`able; every clone shares the same worker task.
#[derive(Clone, Debug)]
pub struct AgentHandle {
    agent_id: AgentId,
    commands: mpsc::Sender<KernelCommand>,
    signals: mpsc::UnboundedSender<Envelope>,
}

impl AgentHandle {
    /// Returns the identifier of the agent this handle addresses.
    #[must_use]
    pub const fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    /// Returns the worker's current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Closed`] if the worker has exited.
    pub async fn get_agent(&self) -> KernelResult<AgentSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(KernelCommand::GetAgent { reply })
            .await
            .map_err(|_| KernelError::Closed)?;
        rx.await.map_err(|_| KernelError::Closed)
    }

    /// Applies `transform` to the worker's current snapshot, committing the
    /// result iff the transform completes normally and returns a version
    /// exactly one greater than the current version.
    ///
    /// `timeout` bounds only the wait for a reply: if it elapses, the
    /// in-flight transform keeps running on the worker task and may still
    /// commit; the caller just stops waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::TransformFailed`] if the transform errors,
    /// panics, or returns a non-monotonic version, [`KernelError::Timeout`]
    /// if `timeout` elapses before a reply arrives, or [`KernelError::Closed`]
    /// if the worker has exited.
    pub async fn update_agent<F>(&self, transform: F, timeout: Option<Duration>) -> KernelResult<AgentSnapshot>
    where
        F: FnOnce(&AgentSnapshot) -> Result<AgentSnapshot, String> + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(KernelCommand::UpdateAgent {
                transform: Box::new(transform),
                reply,
            })
            .await
            .map_err(|_| KernelError::Closed)?;
        await_reply(rx, timeout).await
    }

    /// Dispatches a request/response action to the user behavior.
    ///
    /// `timeout` bounds only the wait for a reply: if it elapses, the action
    /// keeps running on the worker task and may still commit; the caller
    /// just stops waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::ActionRejected`] if the callback rejects the
    /// action, [`KernelError::ExecutionFailed`] if it panics,
    /// [`KernelError::Timeout`] if `timeout` elapses before a reply arrives,
    /// or [`KernelError::Closed`] if the worker has exited.
    pub async fn execute_action(
        &self,
        action: impl Into<String>,
        params: Value,
        timeout: Option<Duration>,
    ) -> KernelResult<Value> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(KernelCommand::ExecuteAction {
                action: action.into(),
                params,
                reply,
            })
            .await
            .map_err(|_| KernelError::Closed)?;
        await_reply(rx, timeout).await
    }

    /// Enqueues a message. Returns as soon as the message is queued; the
    /// worker drains its queue sequentially, one handler at a time.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Closed`] if the worker has exited.
    pub async fn send_message(&self, envelope: Envelope) -> KernelResult<()> {
        self.commands
            .send(KernelCommand::Message { envelope })
            .await
            .map_err(|_| KernelError::Closed)
    }

    /// Delivers a signal immediately, ahead of any queued message or command.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Closed`] if the worker has exited.
    pub fn send_signal(&self, envelope: Envelope) -> KernelResult<()> {
        self.signals
            .send(envelope)
            .map_err(|_| KernelError::Closed)
    }

    /// Runs the user `init` callback, committing the post-init snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::ExecutionFailed`] if `init` errors or panics, or
    /// [`KernelError::Closed`] if the worker has exited.
    pub async fn init(&self, config: Value) -> KernelResult<AgentSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(KernelCommand::Init { config, reply })
            .await
            .map_err(|_| KernelError::Closed)?;
        rx.await.map_err(|_| KernelError::Closed)?
    }

    /// Asks the worker to run `terminate` and exit. Idempotent: once the
    /// worker has exited, this succeeds without effect.
    ///
    /// # Errors
    ///
    /// Never returns an error in practice; a closed mailbox is treated as
    /// already-terminated.
    pub async fn terminate(&self, reason: impl Into<String>) -> KernelResult<()> {
        let (reply, rx) = oneshot::channel();
        if self
            .commands
            .send(KernelCommand::Terminate {
                reason: reason.into(),
                reply,
            })
            .await
            .is_err()
        {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }
}

/// Spawns a new agent worker and returns a handle to it plus the liveness
/// watch the registry should install for this worker.
///
/// `topics`/`patterns` are subscribed on the bus before the worker accepts
/// its first command, so no event emitted after this call is missed.
///
/// # Errors
///
/// Returns [`KernelError::Closed`] if the event bus has shut down.
pub async fn spawn(
    initial_snapshot: AgentSnapshot,
    behavior: Arc<dyn AgentBehavior>,
    registry: Registry,
    bus: EventBus,
    topics: Vec<String>,
    patterns: Vec<String>,
    config: WorkerConfig,
) -> KernelResult<(AgentHandle, LivenessWatch)> {
    let agent_id = initial_snapshot.id();
    let (command_tx, command_rx) = mpsc::channel(config.command_mailbox_capacity().get());
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();
    let (sentinel, watch) = LivenessSentinel::pair();

    let handle = AgentHandle {
        agent_id,
        commands: command_tx,
        signals: signal_tx,
    };

    let (bus_sentinel, bus_watch) = LivenessSentinel::pair();
    let (subscriber_id, event_rx) = bus
        .subscriber(bus_watch)
        .await
        .map_err(|_| KernelError::Closed)?;
    for topic in &topics {
        let _ = bus.subscribe(subscriber_id, topic.clone()).await;
    }
    for pattern in &patterns {
        let _ = bus.subscribe_pattern(subscriber_id, pattern.clone()).await;
    }

    let self_worker_handle = WorkerHandle::new(handle.clone());
    let worker = Worker {
        agent_id,
        current: initial_snapshot,
        behavior,
        registry,
        bus,
        self_handle: self_worker_handle,
        _sentinel: sentinel,
        _bus_sentinel: bus_sentinel,
    };

    tokio::spawn(worker.run(command_rx, signal_rx, event_rx));

    Ok((handle, watch))
}

struct Worker {
    agent_id: AgentId,
    current: AgentSnapshot,
    behavior: Arc<dyn AgentBehavior>,
    registry: Registry,
    bus: EventBus,
    self_handle: WorkerHandle,
    _sentinel: LivenessSentinel,
    _bus_sentinel: LivenessSentinel,
}

impl Worker {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<KernelCommand>,
        mut signals: mpsc::UnboundedReceiver<Envelope>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        loop {
            tokio::select! {
                biased;

                Some(signal) = signals.recv() => {
                    self.handle_signal(signal).await;
                }
                Some(event) = events.recv() => {
                    self.handle_event(event).await;
                }
                maybe_command = commands.recv() => {
                    match maybe_command {
                        Some(KernelCommand::Terminate { reason, reply }) => {
                            self.handle_terminate(reason).await;
                            let _ = reply.send(());
                            break;
                        }
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
            }
        }
    }

    async fn handle_command(&mut self, command: KernelCommand) {
        match command {
            KernelCommand::Init { config, reply } => {
                let result = self.handle_init(config).await;
                let _ = reply.send(result);
            }
            KernelCommand::GetAgent { reply } => {
                let _ = reply.send(self.current.clone());
            }
            KernelCommand::UpdateAgent { transform, reply } => {
                let result = self.handle_update(transform).await;
                let _ = reply.send(result);
            }
            KernelCommand::ExecuteAction {
                action,
                params,
                reply,
            } => {
                let result = self.handle_execute_action(action, params).await;
                let _ = reply.send(result);
            }
            KernelCommand::Message { envelope } => {
                self.handle_message(envelope).await;
            }
            KernelCommand::Terminate { .. } => unreachable!("handled in run()"),
        }
    }

    async fn handle_init(&mut self, config: Value) -> KernelResult<AgentSnapshot> {
        let behavior = Arc::clone(&self.behavior);
        let snapshot = self.current.clone();
        let outcome = spawn_guarded(async move { behavior.init(&snapshot, &config).await }).await;

        let state = match outcome {
            Ok(Ok(state)) => state,
            Ok(Err(reason)) => return Err(KernelError::ExecutionFailed { reason }),
            Err(reason) => return Err(KernelError::ExecutionFailed { reason }),
        };

        let next = crate::lifecycle::transition(
            self.agent_id,
            self.current.lifecycle(),
            crate::lifecycle::LifecycleEvent::InitCompleted,
        )?;
        self.current = self.current.committed(state, next);
        self.sync_registry().await?;
        Ok(self.current.clone())
    }

    async fn handle_update(&mut self, transform: Transform) -> KernelResult<AgentSnapshot> {
        let current = self.current.clone();
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| transform(&current)));

        let new_snapshot = match result {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(reason)) => return Err(KernelError::TransformFailed { reason }),
            Err(_) => {
                return Err(KernelError::TransformFailed {
                    reason: "transform panicked".to_string(),
                });
            }
        };

        self.current = new_snapshot;
        self.sync_registry().await?;
        Ok(self.current.clone())
    }

    async fn handle_execute_action(&mut self, action: String, params: Value) -> KernelResult<Value> {
        let behavior = Arc::clone(&self.behavior);
        let snapshot = self.current.clone();
        let action_for_callback = action.clone();
        let params_for_callback = params.clone();
        let outcome = spawn_guarded(async move {
            behavior
                .handle_action(&snapshot, &action_for_callback, &params_for_callback)
                .await
        })
        .await;

        match outcome {
            Ok(ActionOutcome::Ok { state, result }) => {
                self.current = self.current.committed(state, self.current.lifecycle());
                self.sync_registry().await?;
                self.emit_best_effort(
                    crate::topics::ACTION_EXECUTED,
                    json!({
                        "agent_id": self.agent_id.to_string(),
                        "action": action,
                        "params": params,
                        "result": result,
                    }),
                )
                .await;
                Ok(result)
            }
            Ok(ActionOutcome::Err { reason }) => {
                self.emit_best_effort(
                    crate::topics::ACTION_FAILED,
                    json!({
                        "agent_id": self.agent_id.to_string(),
                        "action": action,
                        "params": params,
                        "reason": reason,
                    }),
                )
                .await;
                Err(KernelError::ActionRejected { reason })
            }
            Err(reason) => {
                warn!(agent_id = %self.agent_id, %action, %reason, "action handler crashed");
                Err(KernelError::ExecutionFailed { reason })
            }
        }
    }

    async fn handle_message(&mut self, envelope: Envelope) {
        let behavior = Arc::clone(&self.behavior);
        let snapshot = self.current.clone();
        let outcome = spawn_guarded(async move { behavior.handle_message(&snapshot, &envelope).await }).await;
        self.apply_callback_state(outcome, "message").await;
    }

    async fn handle_signal(&mut self, envelope: Envelope) {
        let behavior = Arc::clone(&self.behavior);
        let snapshot = self.current.clone();
        let outcome = spawn_guarded(async move { behavior.handle_signal(&snapshot, &envelope).await }).await;
        self.apply_callback_state(outcome, "signal").await;
    }

    async fn handle_event(&mut self, event: Event) {
        let behavior = Arc::clone(&self.behavior);
        let snapshot = self.current.clone();
        let outcome = spawn_guarded(async move { behavior.handle_event(&snapshot, &event).await }).await;
        self.apply_callback_state(outcome, "event").await;
    }

    async fn apply_callback_state(&mut self, outcome: Result<Value, String>, kind: &str) {
        match outcome {
            Ok(state) => {
                self.current = self.current.committed(state, self.current.lifecycle());
                if let Err(err) = self.sync_registry().await {
                    warn!(agent_id = %self.agent_id, %kind, %err, "registry write-through failed");
                }
            }
            Err(reason) => {
                warn!(agent_id = %self.agent_id, %kind, %reason, "handler crashed");
            }
        }
    }

    async fn handle_terminate(&mut self, reason: String) {
        let behavior = Arc::clone(&self.behavior);
        let target = crate::lifecycle::transition(
            self.agent_id,
            self.current.lifecycle(),
            crate::lifecycle::LifecycleEvent::Retire,
        )
        .unwrap_or_else(|err| {
            warn!(agent_id = %self.agent_id, %err, "terminating from an unexpected lifecycle stage");
            agent_primitives::Lifecycle::Terminating
        });
        let snapshot = self.current.committed(self.current.state().clone(), target);
        self.current = snapshot.clone();
        let _ = self.sync_registry().await;

        let outcome = spawn_guarded(async move {
            behavior.terminate(&snapshot, &reason).await;
            Ok(())
        })
        .await;
        if let Err(reason) = outcome {
            warn!(agent_id = %self.agent_id, %reason, "terminate callback crashed");
        }
    }

    async fn sync_registry(&self) -> KernelResult<()> {
        let expected = self.current.clone();
        self.registry
            .update_agent(self.agent_id, move |_| Ok(expected.clone()))
            .await?;
        Ok(())
    }

    async fn emit_best_effort(&self, topic: &str, data: Value) {
        let _ = self
            .bus
            .emit(topic, data, Value::Null, Some(self.self_handle.clone()))
            .await;
    }
}

/// Awaits a command reply, optionally bounded by `timeout`.
///
/// A timeout only stops the *caller* from waiting; the worker has already
/// received the command and its in-flight step continues to run to
/// completion, matching the source's timeout semantics for synchronous calls.
async fn await_reply<T>(rx: oneshot::Receiver<KernelResult<T>>, timeout: Option<Duration>) -> KernelResult<T> {
    match timeout {
        None => rx.await.map_err(|_| KernelError::Closed)?,
        Some(duration) => match tokio::time::timeout(duration, rx).await {
            Ok(reply) => reply.map_err(|_| KernelError::Closed)?,
            Err(_) => Err(KernelError::Timeout),
        },
    }
}

/// Runs `future` on its own task so a panic inside it is caught as a
/// `JoinError` rather than unwinding the worker's own task.
async fn spawn_guarded<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(future).await {
        Ok(value) => Ok(value),
        Err(join_err) if join_err.is_panic() => Err(panic_message(join_err)),
        Err(join_err) => Err(join_err.to_string()),
    }
}

fn panic_message(join_err: tokio::task::JoinError) -> String {
    match join_err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "handler panicked".to_string()),
        Err(join_err) => join_err.to_string(),
    }
}
