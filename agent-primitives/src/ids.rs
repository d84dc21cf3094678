//! Typed, opaque identifiers shared across the agent runtime.

use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::Error;

/// Associates a [`TypedId`] marker type with the tag embedded in its textual form.
pub trait IdKind {
    /// Tag used in the `"<tag>_<uuid-v4>"` textual representation.
    const TAG: &'static str;
}

/// Marker identifying a [`TypedId`] that names an agent.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct AgentKind;

/// Marker identifying a [`TypedId`] that names an event.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKind;

/// Marker identifying a [`TypedId`] that names an event-bus subscriber.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SubscriberKind;

impl IdKind for AgentKind {
    const TAG: &'static str = "agent";
}

impl IdKind for EventKind {
    const TAG: &'static str = "event";
}

impl IdKind for SubscriberKind {
    const TAG: &'static str = "sub";
}

/// A globally unique identifier tagged with its kind at the type level.
///
/// `TypedId<AgentKind>` and `TypedId<EventKind>` wrap the same `Uuid` but are
/// distinct types, so the compiler rejects passing one where the other is
/// expected.
pub struct TypedId<Kind> {
    uuid: Uuid,
    _kind: PhantomData<fn() -> Kind>,
}

impl<Kind> Clone for TypedId<Kind> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Kind> Copy for TypedId<Kind> {}

impl<Kind> PartialEq for TypedId<Kind> {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl<Kind> Eq for TypedId<Kind> {}

impl<Kind> PartialOrd for TypedId<Kind> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<Kind> Ord for TypedId<Kind> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.uuid.cmp(&other.uuid)
    }
}

impl<Kind> Hash for TypedId<Kind> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl<Kind: IdKind> Debug for TypedId<Kind> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple(Kind::TAG).field(&self.uuid).finish()
    }
}

impl<Kind: IdKind> TypedId<Kind> {
    /// Generates a random identifier of this kind.
    #[must_use]
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Wraps an existing UUID, tagging it with this kind.
    ///
    /// Used when restoring an identifier from a caller-supplied value rather
    /// than minting a fresh one.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _kind: PhantomData,
        }
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.uuid
    }
}

impl<Kind: IdKind> Default for TypedId<Kind> {
    fn default() -> Self {
        Self::random()
    }
}

impl<Kind: IdKind> Display for TypedId<Kind> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", Kind::TAG, self.uuid)
    }
}

impl<Kind: IdKind> FromStr for TypedId<Kind> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, rest) = s.split_once('_').ok_or_else(|| Error::InvalidId {
            id: s.to_owned(),
            reason: "missing `<type>_` prefix".into(),
        })?;

        if tag != Kind::TAG {
            return Err(Error::InvalidId {
                id: s.to_owned(),
                reason: format!("expected type tag `{}`, found `{tag}`", Kind::TAG),
            });
        }

        let uuid = Uuid::parse_str(rest).map_err(|source| Error::InvalidId {
            id: s.to_owned(),
            reason: source.to_string(),
        })?;

        Ok(Self::from_uuid(uuid))
    }
}

impl<Kind: IdKind> Serialize for TypedId<Kind> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de, Kind: IdKind> Deserialize<'de> for TypedId<Kind> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(DeError::custom)
    }
}

/// Unique identifier for an agent registered with the runtime.
pub type AgentId = TypedId<AgentKind>;
/// Unique identifier for an event published on the bus.
pub type EventId = TypedId<EventKind>;
/// Unique identifier for an event-bus subscriber.
pub type SubscriberId = TypedId<SubscriberKind>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_agent_id() {
        let id = AgentId::random();
        let parsed = id.to_string().parse::<AgentId>().expect("parse");
        assert_eq!(id, parsed);
        assert!(id.to_string().starts_with("agent_"));
    }

    #[test]
    fn round_trip_event_and_subscriber_ids() {
        let event = EventId::random();
        assert!(event.to_string().starts_with("event_"));
        assert_eq!(event, event.to_string().parse().unwrap());

        let sub = SubscriberId::random();
        assert!(sub.to_string().starts_with("sub_"));
    }

    #[test]
    fn wrong_tag_is_rejected() {
        let event = EventId::random();
        let err = event.to_string().parse::<AgentId>().unwrap_err();
        assert!(matches!(err, Error::InvalidId { .. }));
    }

    #[test]
    fn from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = AgentId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }
}
