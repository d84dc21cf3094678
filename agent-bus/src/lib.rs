//! Broadcast publish/subscribe with exact-match and glob-pattern
//! subscriptions, bounded history, and automatic subscriber cleanup.
//!
//! Like the registry, the bus is a single actor task reachable through a
//! mailbox: fan-out, pattern matching, and history bookkeeping all run on
//! that one task, giving per-topic-per-subscriber delivery order for free.

#![warn(missing_docs, clippy::pedantic)]

mod actor;
mod command;
mod config;
mod error;
mod event;
mod pattern;
mod sink;

use std::sync::Arc;

use agent_primitives::{EventId, LivenessWatch, SubscriberId, WorkerHandle};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use command::Command;

/// Tunable bus parameters.
pub use config::BusConfig;
/// Error type and result alias for bus operations.
pub use error::{BusError, BusResult};
/// An item delivered through the bus.
pub use event::Event;
/// Forwarding target for emitted events.
pub use sink::ExternalSink;

/// Handle to a running event bus actor.
///
/// Cheaply `Clone`able; every clone shares the same mailbox.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: mpsc::Sender<Command>,
}

impl EventBus {
    /// Spawns a new event bus actor with no external sink.
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        Self::with_sink(config, None)
    }

    /// Spawns a new event bus actor that additionally forwards every emitted
    /// event to `sink`, best-effort.
    #[must_use]
    pub fn with_sink(config: BusConfig, sink: Option<Arc<dyn ExternalSink>>) -> Self {
        let (tx, rx) = mpsc::channel(config.mailbox_capacity().get());
        let self_tx = tx.clone();
        let max_history = config.max_history().get();
        tokio::spawn(actor::run(rx, self_tx, max_history, sink));
        Self { sender: tx }
    }

    /// Registers a new subscriber identity with a liveness watch, and
    /// returns its mailbox. The subscriber holds no topic or pattern
    /// subscriptions until [`EventBus::subscribe`] or
    /// [`EventBus::subscribe_pattern`] is called with the returned id.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] if the actor has shut down.
    pub async fn subscriber(
        &self,
        watch: LivenessWatch,
    ) -> BusResult<(SubscriberId, mpsc::UnboundedReceiver<Event>)> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::CreateSubscriber { watch, reply }).await?;
        rx.await.map_err(|_| BusError::Closed)
    }

    /// Subscribes `subscriber_id` to an exact topic.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::UnknownSubscriber`] if `subscriber_id` was not
    /// created through [`EventBus::subscriber`].
    pub async fn subscribe(
        &self,
        subscriber_id: SubscriberId,
        topic: impl Into<String>,
    ) -> BusResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscribe {
            subscriber_id,
            topic: topic.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| BusError::Closed)?
    }

    /// Subscribes `subscriber_id` to a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::UnknownSubscriber`] if `subscriber_id` was not
    /// created through [`EventBus::subscriber`], or
    /// [`BusError::InvalidPattern`] if the pattern does not compile.
    pub async fn subscribe_pattern(
        &self,
        subscriber_id: SubscriberId,
        pattern: impl Into<String>,
    ) -> BusResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SubscribePattern {
            subscriber_id,
            pattern: pattern.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| BusError::Closed)?
    }

    /// Removes an exact-topic subscription. Idempotent: succeeds even if
    /// `subscriber_id` was never subscribed to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] if the actor has shut down.
    pub async fn unsubscribe(&self, subscriber_id: SubscriberId, topic: impl Into<String>) -> BusResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Unsubscribe {
            subscriber_id,
            topic: topic.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| BusError::Closed)
    }

    /// Removes a pattern subscription. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] if the actor has shut down.
    pub async fn unsubscribe_pattern(
        &self,
        subscriber_id: SubscriberId,
        pattern: impl Into<String>,
    ) -> BusResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::UnsubscribePattern {
            subscriber_id,
            pattern: pattern.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| BusError::Closed)
    }

    /// Emits an event. Returns the new event's id immediately, without
    /// waiting for any subscriber to actually consume it.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] if the actor has shut down.
    pub async fn emit(
        &self,
        topic: impl Into<String>,
        data: Value,
        metadata: Value,
        source: Option<WorkerHandle>,
    ) -> BusResult<EventId> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Emit {
            topic: topic.into(),
            data,
            metadata,
            source,
            reply,
        })
        .await?;
        rx.await.map_err(|_| BusError::Closed)
    }

    /// Returns the most recent `limit` events in emission order.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] if the actor has shut down.
    pub async fn get_history(&self, limit: usize) -> BusResult<Vec<Event>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::GetHistory { limit, reply }).await?;
        rx.await.map_err(|_| BusError::Closed)
    }

    async fn send(&self, command: Command) -> BusResult<()> {
        self.sender.send(command).await.map_err(|_| BusError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_primitives::LivenessSentinel;
    use std::num::NonZeroUsize;

    fn bus() -> EventBus {
        EventBus::new(BusConfig::default())
    }

    #[tokio::test]
    async fn pattern_subscription_matches_underscore_topic() {
        let bus = bus();
        let (sentinel, watch) = LivenessSentinel::pair();
        let (subscriber_id, mut rx) = bus.subscriber(watch).await.unwrap();
        bus.subscribe_pattern(subscriber_id, "demo.*").await.unwrap();

        bus.emit("demo_ping", Value::Null, Value::Null, None)
            .await
            .unwrap();
        bus.emit("system_status", Value::Null, Value::Null, None)
            .await
            .unwrap();

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.topic(), "demo_ping");
        assert!(rx.try_recv().is_err());
        drop(sentinel);
    }

    #[tokio::test]
    async fn dead_subscriber_is_cleaned_up() {
        let bus = bus();
        let (sentinel, watch) = LivenessSentinel::pair();
        let (subscriber_id, _rx) = bus.subscriber(watch).await.unwrap();
        bus.subscribe(subscriber_id, "topic.t").await.unwrap();

        drop(sentinel);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // Emitting after death must not error, and the dead subscriber must
        // no longer be reachable through a fresh subscribe/unsubscribe round trip.
        bus.emit("topic.t", Value::Null, Value::Null, None)
            .await
            .unwrap();
        let err = bus.subscribe(subscriber_id, "topic.other").await.unwrap_err();
        assert!(matches!(err, BusError::UnknownSubscriber { .. }));
    }

    #[tokio::test]
    async fn history_is_bounded_and_ordered() {
        let config = BusConfig::new(NonZeroUsize::new(100).unwrap());
        let bus = EventBus::with_sink(config, None);

        for i in 0..150 {
            bus.emit(
                format!("seed.{i}"),
                serde_json::json!({ "i": i }),
                Value::Null,
                None,
            )
            .await
            .unwrap();
        }

        let history = bus.get_history(1000).await.unwrap();
        assert_eq!(history.len(), 100);
        assert_eq!(history.first().unwrap().data()["i"], 50);
        assert_eq!(history.last().unwrap().data()["i"], 149);
    }

    #[tokio::test]
    async fn unsubscribe_unknown_topic_is_idempotent() {
        let bus = bus();
        let (sentinel, watch) = LivenessSentinel::pair();
        let (subscriber_id, _rx) = bus.subscriber(watch).await.unwrap();

        bus.unsubscribe(subscriber_id, "never.subscribed").await.unwrap();
        bus.unsubscribe(subscriber_id, "never.subscribed").await.unwrap();
        drop(sentinel);
    }

    #[tokio::test]
    async fn subscribe_then_unsubscribe_returns_to_prior_state() {
        let bus = bus();
        let (sentinel, watch) = LivenessSentinel::pair();
        let (subscriber_id, mut rx) = bus.subscriber(watch).await.unwrap();

        bus.subscribe(subscriber_id, "demo.topic").await.unwrap();
        bus.unsubscribe(subscriber_id, "demo.topic").await.unwrap();

        bus.emit("demo.topic", Value::Null, Value::Null, None)
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
        drop(sentinel);
    }

    #[tokio::test]
    async fn emit_with_no_subscribers_still_records_history() {
        let bus = bus();
        let event_id = bus
            .emit("nobody.listening", Value::Null, Value::Null, None)
            .await
            .unwrap();

        let history = bus.get_history(10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id(), event_id);
    }

    #[tokio::test]
    async fn invalid_pattern_is_rejected() {
        let bus = bus();
        let (sentinel, watch) = LivenessSentinel::pair();
        let (subscriber_id, _rx) = bus.subscriber(watch).await.unwrap();

        let err = bus
            .subscribe_pattern(subscriber_id, "bad..pattern")
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::InvalidPattern { .. }));
        drop(sentinel);
    }
}
