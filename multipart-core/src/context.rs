//! Services a container shares with its parts and listeners.

use crate::bus::{EventBus, ListenerId};
use crate::event::{Event, EventKind};
use crate::property::{Property, PropertyAggregator, PropertyChange};
use multipart_types::{OwnerKey, PropertyId};
use std::cell::{Cell, RefCell};

/// The event bus and property aggregator of one container, plus the
/// notifications the container collects from them.
///
/// Handed by shared reference to `Part::on_added`/`on_removed` and to every
/// listener callback. All mutation goes through interior mutability, which
/// is sound because a container is only ever touched from one thread.
#[derive(Debug, Default)]
pub struct PartContext {
    bus: EventBus,
    properties: PropertyAggregator,
    changed_properties: RefCell<Vec<PropertyId>>,
    redraw: Cell<bool>,
}

impl PartContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn properties(&self) -> &PropertyAggregator {
        &self.properties
    }

    // ── Events ───────────────────────────────────────────────────

    /// Fires `event` and reports whether any listener received it.
    pub fn fire(&self, event: &mut Event) -> bool {
        self.bus.fire(self, event)
    }

    pub fn add_listener<F>(&self, key: OwnerKey, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&mut Event, &PartContext) + 'static,
    {
        self.bus.add_listener(self, key, kind, Box::new(callback))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.bus.remove_listener(self, id)
    }

    pub fn remove_listeners(&self, key: OwnerKey) -> usize {
        self.bus.remove_listeners(self, key)
    }

    // ── Properties ───────────────────────────────────────────────

    pub fn value<T: Clone + PartialEq + 'static>(&self, property: &Property<T>) -> T {
        self.properties.value(property)
    }

    /// Sets `key`'s contribution and fires `PropertyChanged` when the
    /// combined value moved.
    pub fn set_value<T: Clone + PartialEq + 'static>(
        &self,
        key: OwnerKey,
        property: &Property<T>,
        value: T,
    ) {
        if let Some(change) = self.properties.set_value(key, property, value) {
            self.notify(change);
        }
    }

    /// Drops every contribution made by `key`.
    pub fn clear_values(&self, key: OwnerKey) {
        for change in self.properties.clear_values(key) {
            self.notify(change);
        }
    }

    fn notify(&self, change: PropertyChange) {
        {
            let mut changed = self.changed_properties.borrow_mut();
            if !changed.contains(&change.property()) {
                changed.push(change.property());
            }
        }
        self.fire(&mut Event::PropertyChanged(change));
    }

    /// Ids of properties whose combined value changed since the last call,
    /// each once, in order of first change.
    pub fn take_changed_properties(&self) -> Vec<PropertyId> {
        std::mem::take(&mut *self.changed_properties.borrow_mut())
    }

    // ── Presentation ─────────────────────────────────────────────

    /// Asks for derived presentation state to be recomputed on every side.
    pub fn request_redraw(&self) {
        self.redraw.set(true);
    }

    pub(crate) fn take_redraw(&self) -> bool {
        self.redraw.replace(false)
    }
}
