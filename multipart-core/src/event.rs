//! Events routed through a container's bus.
//!
//! Events form a closed set. Listeners subscribe to an [`EventKind`] and
//! receive every event whose kind is that kind or one of its descendants,
//! so subscribing to [`EventKind::Lifecycle`] sees offers, additions and
//! both removal phases.

use crate::bus::ListenerId;
use crate::property::PropertyChange;
use multipart_types::{Direction, OwnerKey, PartId, PartTypeId, Shape};

/// Tag used to match events against registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Any,
    Lifecycle,
    PartOffered,
    PartAdded,
    PartPreRemoved,
    PartRemoved,
    ListenerChanged,
    ListenerAdded,
    ListenerRemoved,
    PropertyChanged,
    ContainerState,
    Loaded,
    Invalidated,
    Unloaded,
    Tick,
    Query,
    Domain,
}

impl EventKind {
    /// The kind this one specialises, `None` for [`EventKind::Any`].
    pub const fn parent(self) -> Option<EventKind> {
        use EventKind::*;
        match self {
            Any => None,
            PartOffered | PartAdded | PartPreRemoved | PartRemoved => Some(Lifecycle),
            ListenerAdded | ListenerRemoved => Some(ListenerChanged),
            Loaded | Invalidated | Unloaded => Some(ContainerState),
            Lifecycle | ListenerChanged | PropertyChanged | ContainerState | Tick | Query
            | Domain => Some(Any),
        }
    }

    /// True when `self` is `ancestor` or descends from it.
    pub fn is_a(self, ancestor: EventKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

/// A part as seen by lifecycle listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct PartEvent {
    pub id: PartId,
    pub part_type: PartTypeId,
    /// Wire index: the would-be index for offers, the index the part had
    /// before leaving for removals.
    pub index: usize,
    pub shape: Shape,
}

/// Cancellable admission announcement.
#[derive(Debug, Clone)]
pub struct PartOffered {
    pub part: PartEvent,
    vetoed: bool,
}

impl PartOffered {
    pub fn new(part: PartEvent) -> Self {
        Self {
            part,
            vetoed: false,
        }
    }

    /// Rejects the offer. Sticky: later listeners cannot un-veto.
    pub fn veto(&mut self) {
        self.vetoed = true;
    }

    pub fn is_vetoed(&self) -> bool {
        self.vetoed
    }
}

/// Payload of the listener meta-events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerInfo {
    pub id: ListenerId,
    pub key: OwnerKey,
    pub kind: EventKind,
}

/// Container-level state transitions reported to parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Loaded,
    Invalidated,
    Unloaded,
}

/// Running-maximum query answered by listeners, e.g. "strongest signal
/// emitted towards this side".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEvent {
    pub name: String,
    pub side: Option<Direction>,
    value: i64,
}

impl QueryEvent {
    pub fn new(name: impl Into<String>, side: Option<Direction>) -> Self {
        Self {
            name: name.into(),
            side,
            value: 0,
        }
    }

    /// Raises the answer to `value` if it is higher.
    pub fn offer(&mut self, value: i64) {
        self.value = self.value.max(value);
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

/// Free-form event for host behaviours the core knows nothing about.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainEvent {
    pub name: String,
    pub data: serde_json::Value,
}

impl DomainEvent {
    pub fn new(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Everything that can travel over an event bus.
#[derive(Debug)]
pub enum Event {
    PartOffered(PartOffered),
    PartAdded(PartEvent),
    PartPreRemoved(PartEvent),
    PartRemoved(PartEvent),
    ListenerAdded(ListenerInfo),
    ListenerRemoved(ListenerInfo),
    PropertyChanged(PropertyChange),
    ContainerState(ContainerState),
    /// Carries the container's tick counter.
    Tick(u64),
    Query(QueryEvent),
    Domain(DomainEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PartOffered(_) => EventKind::PartOffered,
            Event::PartAdded(_) => EventKind::PartAdded,
            Event::PartPreRemoved(_) => EventKind::PartPreRemoved,
            Event::PartRemoved(_) => EventKind::PartRemoved,
            Event::ListenerAdded(_) => EventKind::ListenerAdded,
            Event::ListenerRemoved(_) => EventKind::ListenerRemoved,
            Event::PropertyChanged(_) => EventKind::PropertyChanged,
            Event::ContainerState(ContainerState::Loaded) => EventKind::Loaded,
            Event::ContainerState(ContainerState::Invalidated) => EventKind::Invalidated,
            Event::ContainerState(ContainerState::Unloaded) => EventKind::Unloaded,
            Event::Tick(_) => EventKind::Tick,
            Event::Query(_) => EventKind::Query,
            Event::Domain(_) => EventKind::Domain,
        }
    }
}
