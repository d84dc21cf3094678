//! The event bus's actor loop: a single task owning all subscription state.
//!
//! As in the registry, serialization comes from the mailbox — one task, one
//! `mpsc::Receiver` — not from a lock, giving per-topic-per-subscriber FIFO
//! delivery order for free.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use agent_primitives::{EventId, SubscriberId};
use tokio::sync::mpsc;
use tracing::warn;

use crate::command::Command;
use crate::error::BusError;
use crate::event::Event;
use crate::pattern::{self, PatternSegment};
use crate::sink::ExternalSink;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Location {
    Exact(String),
    Pattern(String),
}

struct PatternEntry {
    segments: Vec<PatternSegment>,
    subscribers: Vec<SubscriberId>,
}

#[derive(Default)]
struct State {
    senders: HashMap<SubscriberId, mpsc::UnboundedSender<Event>>,
    exact: HashMap<String, Vec<SubscriberId>>,
    patterns: HashMap<String, PatternEntry>,
    reverse: HashMap<SubscriberId, Vec<Location>>,
    history: VecDeque<Event>,
}

impl State {
    fn remove_subscriber(&mut self, subscriber_id: SubscriberId) {
        let Some(locations) = self.reverse.remove(&subscriber_id) else {
            self.senders.remove(&subscriber_id);
            return;
        };

        for location in locations {
            match location {
                Location::Exact(topic) => {
                    if let Some(subs) = self.exact.get_mut(&topic) {
                        subs.retain(|id| *id != subscriber_id);
                        if subs.is_empty() {
                            self.exact.remove(&topic);
                        }
                    }
                }
                Location::Pattern(pattern) => {
                    if let Some(entry) = self.patterns.get_mut(&pattern) {
                        entry.subscribers.retain(|id| *id != subscriber_id);
                        if entry.subscribers.is_empty() {
                            self.patterns.remove(&pattern);
                        }
                    }
                }
            }
        }

        self.senders.remove(&subscriber_id);
    }

    fn push_history(&mut self, event: Event, max_history: usize) {
        self.history.push_back(event);
        while self.history.len() > max_history {
            self.history.pop_front();
        }
    }
}

pub(crate) async fn run(
    mut mailbox: mpsc::Receiver<Command>,
    self_tx: mpsc::Sender<Command>,
    max_history: usize,
    sink: Option<Arc<dyn ExternalSink>>,
) {
    let mut state = State::default();

    while let Some(command) = mailbox.recv().await {
        handle_command(&mut state, command, &self_tx, max_history, sink.as_deref());
    }
}

fn handle_command(
    state: &mut State,
    command: Command,
    self_tx: &mpsc::Sender<Command>,
    max_history: usize,
    sink: Option<&dyn ExternalSink>,
) {
    match command {
        Command::CreateSubscriber { watch, reply } => {
            let subscriber_id = SubscriberId::random();
            let (tx, rx) = mpsc::unbounded_channel();
            state.senders.insert(subscriber_id, tx);
            state.reverse.insert(subscriber_id, Vec::new());
            spawn_watchdog(subscriber_id, watch, self_tx.clone());
            let _ = reply.send((subscriber_id, rx));
        }

        Command::Subscribe {
            subscriber_id,
            topic,
            reply,
        } => {
            let result = if state.senders.contains_key(&subscriber_id) {
                state.exact.entry(topic.clone()).or_default().push(subscriber_id);
                state
                    .reverse
                    .entry(subscriber_id)
                    .or_default()
                    .push(Location::Exact(topic));
                Ok(())
            } else {
                Err(BusError::UnknownSubscriber { subscriber_id })
            };
            let _ = reply.send(result);
        }

        Command::SubscribePattern {
            subscriber_id,
            pattern,
            reply,
        } => {
            let result = subscribe_pattern(state, subscriber_id, pattern);
            let _ = reply.send(result);
        }

        Command::Unsubscribe {
            subscriber_id,
            topic,
            reply,
        } => {
            if let Some(subs) = state.exact.get_mut(&topic) {
                subs.retain(|id| *id != subscriber_id);
                if subs.is_empty() {
                    state.exact.remove(&topic);
                }
            }
            if let Some(locations) = state.reverse.get_mut(&subscriber_id) {
                locations.retain(|loc| *loc != Location::Exact(topic.clone()));
            }
            let _ = reply.send(());
        }

        Command::UnsubscribePattern {
            subscriber_id,
            pattern,
            reply,
        } => {
            if let Some(entry) = state.patterns.get_mut(&pattern) {
                entry.subscribers.retain(|id| *id != subscriber_id);
                if entry.subscribers.is_empty() {
                    state.patterns.remove(&pattern);
                }
            }
            if let Some(locations) = state.reverse.get_mut(&subscriber_id) {
                locations.retain(|loc| *loc != Location::Pattern(pattern.clone()));
            }
            let _ = reply.send(());
        }

        Command::Emit {
            topic,
            data,
            metadata,
            source,
            reply,
        } => {
            let event_id = emit(state, topic, data, metadata, source, max_history, sink);
            let _ = reply.send(event_id);
        }

        Command::GetHistory { limit, reply } => {
            let take = limit.min(state.history.len());
            let events = state
                .history
                .iter()
                .rev()
                .take(take)
                .cloned()
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            let _ = reply.send(events);
        }

        Command::SubscriberDied { subscriber_id } => {
            state.remove_subscriber(subscriber_id);
        }
    }
}

fn subscribe_pattern(
    state: &mut State,
    subscriber_id: SubscriberId,
    pattern: String,
) -> Result<(), BusError> {
    if !state.senders.contains_key(&subscriber_id) {
        return Err(BusError::UnknownSubscriber { subscriber_id });
    }

    let entry = state.patterns.entry(pattern.clone()).or_insert_with(|| {
        // Placeholder; replaced below if compilation succeeds. Compilation is
        // attempted once per distinct pattern string.
        PatternEntry {
            segments: Vec::new(),
            subscribers: Vec::new(),
        }
    });

    if entry.segments.is_empty() && entry.subscribers.is_empty() {
        match pattern::compile(&pattern) {
            Ok(segments) => entry.segments = segments,
            Err(reason) => {
                state.patterns.remove(&pattern);
                return Err(BusError::InvalidPattern { pattern, reason });
            }
        }
    }

    let entry = state.patterns.get_mut(&pattern).expect("just inserted");
    entry.subscribers.push(subscriber_id);
    state
        .reverse
        .entry(subscriber_id)
        .or_default()
        .push(Location::Pattern(pattern));

    Ok(())
}

fn emit(
    state: &mut State,
    topic: String,
    data: serde_json::Value,
    metadata: serde_json::Value,
    source: Option<agent_primitives::WorkerHandle>,
    max_history: usize,
    sink: Option<&dyn ExternalSink>,
) -> EventId {
    let event = Event::new(topic.clone(), data, metadata, source);
    let event_id = event.id();

    state.push_history(event.clone(), max_history);

    if let Some(subs) = state.exact.get(&topic) {
        for subscriber_id in subs {
            deliver(state, *subscriber_id, &event);
        }
    }

    let topic_segments = pattern::split_topic(&topic);
    for entry in state.patterns.values() {
        if pattern::matches(&entry.segments, &topic_segments) {
            for subscriber_id in &entry.subscribers {
                deliver_by_sender(&state.senders, *subscriber_id, &event);
            }
        }
    }

    if let Some(sink) = sink {
        if let Err(reason) = sink.forward(&topic, &event) {
            warn!(topic = %topic, %reason, "external sink forward failed");
        }
    }

    event_id
}

fn deliver(state: &State, subscriber_id: SubscriberId, event: &Event) {
    deliver_by_sender(&state.senders, subscriber_id, event);
}

fn deliver_by_sender(
    senders: &HashMap<SubscriberId, mpsc::UnboundedSender<Event>>,
    subscriber_id: SubscriberId,
    event: &Event,
) {
    if let Some(sender) = senders.get(&subscriber_id) {
        // An error here means the subscriber's receiver was dropped without
        // the liveness watch having fired yet; the pending event is simply
        // lost, matching best-effort delivery.
        let _ = sender.send(event.clone());
    }
}

fn spawn_watchdog(
    subscriber_id: SubscriberId,
    watch: agent_primitives::LivenessWatch,
    self_tx: mpsc::Sender<Command>,
) {
    tokio::spawn(async move {
        watch.died().await;
        let _ = self_tx.send(Command::SubscriberDied { subscriber_id }).await;
    });
}
