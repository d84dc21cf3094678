//! Sum type of requests accepted by the event bus actor's mailbox.

use agent_primitives::{EventId, LivenessWatch, SubscriberId, WorkerHandle};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::BusResult;
use crate::event::Event;

pub(crate) enum Command {
    CreateSubscriber {
        watch: LivenessWatch,
        reply: oneshot::Sender<(SubscriberId, mpsc::UnboundedReceiver<Event>)>,
    },
    Subscribe {
        subscriber_id: SubscriberId,
        topic: String,
        reply: oneshot::Sender<BusResult<()>>,
    },
    SubscribePattern {
        subscriber_id: SubscriberId,
        pattern: String,
        reply: oneshot::Sender<BusResult<()>>,
    },
    Unsubscribe {
        subscriber_id: SubscriberId,
        topic: String,
        reply: oneshot::Sender<()>,
    },
    UnsubscribePattern {
        subscriber_id: SubscriberId,
        pattern: String,
        reply: oneshot::Sender<()>,
    },
    Emit {
        topic: String,
        data: Value,
        metadata: Value,
        source: Option<WorkerHandle>,
        reply: oneshot::Sender<EventId>,
    },
    GetHistory {
        limit: usize,
        reply: oneshot::Sender<Vec<Event>>,
    },
    /// Fed by a per-subscriber watchdog task once its liveness watch resolves.
    SubscriberDied {
        subscriber_id: SubscriberId,
    },
}
