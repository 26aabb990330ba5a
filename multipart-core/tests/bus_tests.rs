use multipart_core::{DomainEvent, Event, EventKind, ListenerInfo, PartContext, QueryEvent};
use multipart_types::{Direction, OwnerKey};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Records every listener meta-event as `"+key"` / `"-key"` style entries
/// using the listener id.
fn watch_listeners(cx: &PartContext, log: &Log) {
    let sink = Rc::clone(log);
    cx.add_listener(OwnerKey::new(), EventKind::ListenerChanged, move |event, _| {
        let entry = match event {
            Event::ListenerAdded(info) => format!("+{:?}", info.id),
            Event::ListenerRemoved(info) => format!("-{:?}", info.id),
            other => panic!("unexpected {:?}", other),
        };
        sink.borrow_mut().push(entry);
    });
}

// ── Dispatch ──────────────────────────────────────────────────────

#[test]
fn fire_reports_whether_anyone_listened() {
    let cx = PartContext::new();
    assert!(!cx.fire(&mut Event::Tick(1)));

    cx.add_listener(OwnerKey::new(), EventKind::Tick, |_, _| {});
    assert!(cx.fire(&mut Event::Tick(2)));
    assert!(!cx.fire(&mut Event::Domain(DomainEvent::new("noise", serde_json::Value::Null))));
}

#[test]
fn listeners_fire_in_registration_order_across_keys() {
    let cx = PartContext::new();
    let order = log();
    let (a, b) = (OwnerKey::new(), OwnerKey::new());

    for (key, name) in [(a, "a1"), (b, "b1"), (a, "a2"), (b, "b2")] {
        let sink = Rc::clone(&order);
        cx.add_listener(key, EventKind::Tick, move |_, _| {
            sink.borrow_mut().push(name.to_string());
        });
    }

    cx.fire(&mut Event::Tick(0));
    assert_eq!(*order.borrow(), vec!["a1", "b1", "a2", "b2"]);
}

#[test]
fn supertype_registration_sees_subtypes() {
    let cx = PartContext::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    cx.add_listener(OwnerKey::new(), EventKind::Query, move |event, _| {
        sink.borrow_mut().push(event.kind());
    });
    let sink = Rc::clone(&seen);
    cx.add_listener(OwnerKey::new(), EventKind::Any, move |event, _| {
        if !event.kind().is_a(EventKind::ListenerChanged) {
            sink.borrow_mut().push(EventKind::Any);
        }
    });

    cx.fire(&mut Event::Query(QueryEvent::new("signal", None)));
    cx.fire(&mut Event::Tick(3));

    assert_eq!(
        *seen.borrow(),
        vec![EventKind::Query, EventKind::Any, EventKind::Any]
    );
}

#[test]
fn event_kind_hierarchy() {
    assert!(EventKind::PartAdded.is_a(EventKind::Lifecycle));
    assert!(EventKind::PartAdded.is_a(EventKind::Any));
    assert!(EventKind::Unloaded.is_a(EventKind::ContainerState));
    assert!(!EventKind::Lifecycle.is_a(EventKind::PartAdded));
    assert!(!EventKind::Tick.is_a(EventKind::Lifecycle));
    assert_eq!(EventKind::Any.parent(), None);
}

#[test]
fn listeners_can_mutate_the_event() {
    let cx = PartContext::new();
    for strength in [4, 11, 7] {
        cx.add_listener(OwnerKey::new(), EventKind::Query, move |event, _| {
            if let Event::Query(query) = event {
                query.offer(strength);
            }
        });
    }

    let mut event = Event::Query(QueryEvent::new("signal", Some(Direction::North)));
    cx.fire(&mut event);
    match event {
        Event::Query(query) => assert_eq!(query.value(), 11),
        other => panic!("expected Query, got {:?}", other),
    }
}

#[test]
fn nested_fire_from_a_listener_dispatches_immediately() {
    let cx = PartContext::new();
    let order = log();

    let sink = Rc::clone(&order);
    cx.add_listener(OwnerKey::new(), EventKind::Tick, move |_, cx| {
        sink.borrow_mut().push("tick".into());
        cx.fire(&mut Event::Domain(DomainEvent::new("echo", serde_json::Value::Null)));
        sink.borrow_mut().push("tick done".into());
    });
    let sink = Rc::clone(&order);
    cx.add_listener(OwnerKey::new(), EventKind::Domain, move |_, _| {
        sink.borrow_mut().push("echo".into());
    });

    cx.fire(&mut Event::Tick(0));
    assert_eq!(*order.borrow(), vec!["tick", "echo", "tick done"]);
}

// ── Reentrant registration ────────────────────────────────────────

#[test]
fn listener_added_mid_dispatch_misses_the_in_flight_event() {
    let cx = PartContext::new();
    let late_calls = Rc::new(Cell::new(0));
    let registered = Rc::new(Cell::new(false));

    let counter = Rc::clone(&late_calls);
    let flag = Rc::clone(&registered);
    cx.add_listener(OwnerKey::new(), EventKind::Tick, move |_, cx| {
        if !flag.replace(true) {
            let counter = Rc::clone(&counter);
            cx.add_listener(OwnerKey::new(), EventKind::Tick, move |_, _| {
                counter.set(counter.get() + 1);
            });
        }
    });

    cx.fire(&mut Event::Tick(1));
    assert_eq!(late_calls.get(), 0);
    assert_eq!(cx.bus().listener_count(), 2);

    cx.fire(&mut Event::Tick(2));
    assert_eq!(late_calls.get(), 1);
}

#[test]
fn listener_removed_mid_dispatch_still_sees_the_in_flight_event() {
    let cx = PartContext::new();
    let calls = Rc::new(Cell::new(0));
    let victim_key = OwnerKey::new();

    cx.add_listener(OwnerKey::new(), EventKind::Tick, move |_, cx| {
        cx.remove_listeners(victim_key);
    });
    let counter = Rc::clone(&calls);
    cx.add_listener(victim_key, EventKind::Tick, move |_, _| {
        counter.set(counter.get() + 1);
    });

    cx.fire(&mut Event::Tick(1));
    assert_eq!(calls.get(), 1);
    cx.fire(&mut Event::Tick(2));
    assert_eq!(calls.get(), 1);
}

#[test]
fn meta_events_are_deferred_until_dispatch_ends() {
    let cx = PartContext::new();
    let events = log();
    watch_listeners(&cx, &events);

    let during = Rc::new(Cell::new(usize::MAX));
    let probe = Rc::clone(&during);
    let watched = Rc::clone(&events);
    let tick = cx.add_listener(OwnerKey::new(), EventKind::Tick, move |_, cx| {
        let first = cx.add_listener(OwnerKey::new(), EventKind::Domain, |_, _| {});
        cx.remove_listener(first);
        cx.add_listener(OwnerKey::new(), EventKind::Domain, |_, _| {});
        probe.set(watched.borrow().len());
    });
    events.borrow_mut().clear();

    cx.fire(&mut Event::Tick(0));
    assert_eq!(during.get(), 0);

    let ids: Vec<String> = events.borrow().clone();
    assert_eq!(ids.len(), 3);
    assert!(ids[0].starts_with('+'));
    assert_eq!(ids[1], ids[0].replacen('+', "-", 1));
    assert!(ids[2].starts_with('+'));
    assert_ne!(ids[2], ids[0]);
    assert!(!ids.contains(&format!("+{:?}", tick)));
}

#[test]
fn meta_event_listeners_can_register_more_listeners() {
    let cx = PartContext::new();
    let seen: Rc<RefCell<Vec<ListenerInfo>>> = Rc::new(RefCell::new(Vec::new()));
    let chain_key = OwnerKey::new();

    let sink = Rc::clone(&seen);
    cx.add_listener(OwnerKey::new(), EventKind::ListenerAdded, move |event, cx| {
        if let Event::ListenerAdded(info) = event {
            sink.borrow_mut().push(*info);
            // One follow-up registration per chain-key addition, up to three.
            if info.key == chain_key && cx.bus().listeners_for(chain_key) < 3 {
                cx.add_listener(chain_key, EventKind::Tick, |_, _| {});
            }
        }
    });
    seen.borrow_mut().clear();

    cx.add_listener(chain_key, EventKind::Tick, |_, _| {});

    assert_eq!(cx.bus().listeners_for(chain_key), 3);
    let added: Vec<OwnerKey> = seen.borrow().iter().map(|info| info.key).collect();
    assert_eq!(added, vec![chain_key; 3]);
    assert!(!cx.bus().is_dispatching());
}

// ── Removal by key ────────────────────────────────────────────────

#[test]
fn remove_listeners_by_key_is_exact() {
    let cx = PartContext::new();
    let removed = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&removed);
    cx.add_listener(OwnerKey::new(), EventKind::ListenerRemoved, move |event, _| {
        if let Event::ListenerRemoved(info) = event {
            sink.borrow_mut().push(info.key);
        }
    });

    let (doomed, kept) = (OwnerKey::new(), OwnerKey::new());
    cx.add_listener(doomed, EventKind::Tick, |_, _| {});
    cx.add_listener(kept, EventKind::Tick, |_, _| {});
    cx.add_listener(doomed, EventKind::Query, |_, _| {});
    cx.add_listener(doomed, EventKind::Any, |_, _| {});
    cx.add_listener(kept, EventKind::Domain, |_, _| {});

    assert_eq!(cx.remove_listeners(doomed), 3);
    assert_eq!(*removed.borrow(), vec![doomed; 3]);
    assert_eq!(cx.bus().listeners_for(doomed), 0);
    assert_eq!(cx.bus().listeners_for(kept), 2);
    assert_eq!(cx.remove_listeners(doomed), 0);
    assert_eq!(removed.borrow().len(), 3);
}

#[test]
fn remove_unknown_listener_id_is_false() {
    let cx = PartContext::new();
    let id = cx.add_listener(OwnerKey::new(), EventKind::Tick, |_, _| {});
    assert!(cx.remove_listener(id));
    assert!(!cx.remove_listener(id));
    assert!(!cx.bus().has_listeners(EventKind::Tick));
}

proptest! {
    #[test]
    fn remove_listeners_removes_only_matching_keys(
        owners in prop::collection::vec(0usize..4, 0..24),
        target in 0usize..4
    ) {
        let cx = PartContext::new();
        let keys: Vec<OwnerKey> = (0..4).map(|_| OwnerKey::new()).collect();
        let notifications = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&notifications);
        let target_key = keys[target];
        cx.add_listener(OwnerKey::new(), EventKind::ListenerRemoved, move |event, _| {
            if let Event::ListenerRemoved(info) = event {
                assert_eq!(info.key, target_key);
                counter.set(counter.get() + 1);
            }
        });

        for owner in &owners {
            cx.add_listener(keys[*owner], EventKind::Tick, |_, _| {});
        }
        let expected = owners.iter().filter(|o| **o == target).count();

        prop_assert_eq!(cx.remove_listeners(target_key), expected);
        prop_assert_eq!(notifications.get(), expected);
        for (i, key) in keys.iter().enumerate() {
            let remaining = if i == target { 0 } else { owners.iter().filter(|o| **o == i).count() };
            prop_assert_eq!(cx.bus().listeners_for(*key), remaining);
        }
    }
}
