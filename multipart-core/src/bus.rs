//! Per-container publish/subscribe with reentrant-safe dispatch.
//!
//! The bus keeps two views of its registrations: the authoritative list,
//! which every add/remove updates immediately, and a snapshot that dispatch
//! iterates. While any dispatch is running (call depth > 0) the snapshot is
//! frozen and listener changes only queue a notification. When the
//! outermost dispatch returns, the queue is drained: the snapshot is rebuilt
//! and one `ListenerAdded`/`ListenerRemoved` meta-event is fired per queued
//! change, in the order the changes happened. Meta-event listeners may
//! change registrations again, so draining repeats until the queue is empty.
//!
//! A listener registered mid-dispatch therefore never sees the event that
//! was in flight when it registered.

use crate::context::PartContext;
use crate::event::{Event, EventKind, ListenerInfo};
use multipart_types::OwnerKey;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Callback invoked for matching events.
pub type ListenerFn = dyn Fn(&mut Event, &PartContext);

/// Handle to one registration, for [`EventBus::remove_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    key: OwnerKey,
    kind: EventKind,
    callback: Box<ListenerFn>,
}

impl Registration {
    fn info(&self) -> ListenerInfo {
        ListenerInfo {
            id: self.id,
            key: self.key,
            kind: self.kind,
        }
    }
}

enum PendingChange {
    Added(ListenerInfo),
    Removed(ListenerInfo),
}

impl PendingChange {
    fn into_event(self) -> Event {
        match self {
            PendingChange::Added(info) => Event::ListenerAdded(info),
            PendingChange::Removed(info) => Event::ListenerRemoved(info),
        }
    }
}

pub struct EventBus {
    registrations: RefCell<Vec<Rc<Registration>>>,
    snapshot: RefCell<Rc<[Rc<Registration>]>>,
    pending: RefCell<Vec<PendingChange>>,
    depth: Cell<usize>,
    next_id: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            registrations: RefCell::new(Vec::new()),
            snapshot: RefCell::new(Rc::from(Vec::new())),
            pending: RefCell::new(Vec::new()),
            depth: Cell::new(0),
            next_id: Cell::new(0),
        }
    }

    /// Number of live registrations.
    pub fn listener_count(&self) -> usize {
        self.registrations.borrow().len()
    }

    /// Number of live registrations under `key`.
    pub fn listeners_for(&self, key: OwnerKey) -> usize {
        self.registrations
            .borrow()
            .iter()
            .filter(|r| r.key == key)
            .count()
    }

    /// Whether some registration would observe an event of `kind`.
    pub fn has_listeners(&self, kind: EventKind) -> bool {
        self.registrations
            .borrow()
            .iter()
            .any(|r| kind.is_a(r.kind))
    }

    /// True while a dispatch is running.
    pub fn is_dispatching(&self) -> bool {
        self.depth.get() > 0
    }

    pub(crate) fn add_listener(
        &self,
        cx: &PartContext,
        key: OwnerKey,
        kind: EventKind,
        callback: Box<ListenerFn>,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let registration = Rc::new(Registration {
            id,
            key,
            kind,
            callback,
        });
        let info = registration.info();
        self.registrations.borrow_mut().push(registration);
        self.pending.borrow_mut().push(PendingChange::Added(info));
        trace!(?id, ?kind, depth = self.depth.get(), "listener added");

        if self.depth.get() == 0 {
            self.drain(cx);
        }
        id
    }

    pub(crate) fn remove_listener(&self, cx: &PartContext, id: ListenerId) -> bool {
        let removed = {
            let mut registrations = self.registrations.borrow_mut();
            match registrations.iter().position(|r| r.id == id) {
                Some(index) => registrations.remove(index),
                None => return false,
            }
        };
        self.pending
            .borrow_mut()
            .push(PendingChange::Removed(removed.info()));

        if self.depth.get() == 0 {
            self.drain(cx);
        }
        true
    }

    /// Removes every registration whose key is `key`, queueing one removal
    /// notification per registration. Returns how many were removed.
    pub(crate) fn remove_listeners(&self, cx: &PartContext, key: OwnerKey) -> usize {
        let removed: Vec<Rc<Registration>> = {
            let mut registrations = self.registrations.borrow_mut();
            let (removed, kept) = registrations.drain(..).partition(|r| r.key == key);
            *registrations = kept;
            removed
        };
        if removed.is_empty() {
            return 0;
        }

        self.pending
            .borrow_mut()
            .extend(removed.iter().map(|r| PendingChange::Removed(r.info())));
        trace!(%key, count = removed.len(), "listeners removed");

        if self.depth.get() == 0 {
            self.drain(cx);
        }
        removed.len()
    }

    /// Delivers `event` to every matching registration in registration
    /// order. Returns whether at least one listener received it.
    pub(crate) fn fire(&self, cx: &PartContext, event: &mut Event) -> bool {
        let handled = self.dispatch(cx, event);
        if self.depth.get() == 0 {
            self.drain(cx);
        }
        handled
    }

    fn dispatch(&self, cx: &PartContext, event: &mut Event) -> bool {
        self.depth.set(self.depth.get() + 1);
        let snapshot = Rc::clone(&self.snapshot.borrow());
        let kind = event.kind();

        let mut handled = false;
        for registration in snapshot.iter() {
            if kind.is_a(registration.kind) {
                (registration.callback)(event, cx);
                handled = true;
            }
        }

        self.depth.set(self.depth.get() - 1);
        handled
    }

    fn drain(&self, cx: &PartContext) {
        loop {
            let batch = std::mem::take(&mut *self.pending.borrow_mut());
            if batch.is_empty() {
                break;
            }
            self.rebuild_snapshot();

            // Held above zero so changes made by meta-event listeners queue
            // behind this batch instead of draining recursively.
            self.depth.set(self.depth.get() + 1);
            for change in batch {
                let mut event = change.into_event();
                self.dispatch(cx, &mut event);
            }
            self.depth.set(self.depth.get() - 1);
        }
    }

    fn rebuild_snapshot(&self) {
        let fresh: Rc<[Rc<Registration>]> = self.registrations.borrow().iter().cloned().collect();
        *self.snapshot.borrow_mut() = fresh;
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .field("depth", &self.depth.get())
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}
