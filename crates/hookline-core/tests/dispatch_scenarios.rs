//! End-to-end dispatch scenarios: delegates flowing through an emitter the
//! way a host integration wires them.

use std::cell::{Cell, RefCell};

use hookline_core::{Delegate, Emitter, Observable, Subscription, SubscriptionId};

type List = RefCell<Vec<i32>>;

fn append(list: &List, v: i32) {
    list.borrow_mut().push(v);
}

// ── Scenario: subscribe two lists, unsubscribe one ─────────────────────

#[test]
fn two_lists_then_unsubscribe_first() {
    let a = List::default();
    let b = List::default();
    let r: Emitter<'_, (i32,)> = Emitter::new();

    let id1 = r.observable().subscribe(Delegate::with_payload(append, &a));
    let _id2 = r.observable().subscribe(Delegate::with_payload(append, &b));

    r.notify((7,));
    assert_eq!(*a.borrow(), vec![7]);
    assert_eq!(*b.borrow(), vec![7]);

    r.observable().unsubscribe(id1);
    r.notify((9,));
    assert_eq!(*a.borrow(), vec![7]);
    assert_eq!(*b.borrow(), vec![7, 9]);
}

// ── Scenario: a subscriber removes a later one mid-delivery ────────────

struct Janitor<'a> {
    registry: Observable<'a, (i32,)>,
    target: Cell<Option<SubscriptionId>>,
    calls: Cell<u32>,
}

impl Janitor<'_> {
    fn sweep(&self, _: i32) {
        self.calls.set(self.calls.get() + 1);
        if let Some(id) = self.target.take() {
            self.registry.unsubscribe(id);
        }
    }
}

#[test]
fn removal_during_notify_takes_effect_next_call() {
    let late = List::default();
    let r: Emitter<'_, (i32,)> = Emitter::new();
    let janitor = Janitor {
        registry: r.observable().clone(),
        target: Cell::new(None),
        calls: Cell::new(0),
    };

    r.observable().subscribe_with_payload(Janitor::sweep, &janitor);
    let late_id = r.observable().subscribe_with_payload(append, &late);
    janitor.target.set(Some(late_id));

    r.notify((1,));
    assert_eq!(*late.borrow(), vec![1], "snapshot still delivers to the removed subscriber");
    assert!(!r.observable().is_subscribed(late_id));

    r.notify((2,));
    assert_eq!(*late.borrow(), vec![1]);
    assert_eq!(janitor.calls.get(), 2);
}

// ── Scenario: a component owns its emitter and exposes the observable ──

#[derive(Default)]
struct Lobby<'a> {
    joined: Emitter<'a, (u32, &'static str)>,
    roster: RefCell<Vec<u32>>,
}

impl<'a> Lobby<'a> {
    fn on_joined(&self) -> &Observable<'a, (u32, &'static str)> {
        self.joined.observable()
    }

    fn connect(&self, slot: u32, name: &'static str) {
        self.roster.borrow_mut().push(slot);
        self.joined.notify((slot, name));
    }
}

struct Greeter {
    greeted: RefCell<Vec<String>>,
}

impl Greeter {
    fn greet(&self, slot: u32, name: &'static str) {
        self.greeted.borrow_mut().push(format!("{slot}:{name}"));
    }
}

fn count_slot(seen: &Cell<u32>, _slot: u32) {
    seen.set(seen.get() + 1);
}

#[test]
fn owner_notifies_method_and_function_subscribers() {
    let greeter = Greeter {
        greeted: RefCell::new(Vec::new()),
    };
    let seen = Cell::new(0u32);
    let lobby = Lobby::default();

    let _greet = lobby
        .on_joined()
        .subscribe_scoped(Delegate::with_payload(Greeter::greet, &greeter));
    let counter = lobby
        .on_joined()
        .subscribe_scoped(Delegate::with_payload(count_slot, &seen));

    lobby.connect(1, "ana");
    lobby.connect(2, "bo");
    drop(counter);
    lobby.connect(3, "cy");

    assert_eq!(*greeter.greeted.borrow(), vec!["1:ana", "2:bo", "3:cy"]);
    assert_eq!(seen.get(), 2);
    assert_eq!(*lobby.roster.borrow(), vec![1, 2, 3]);
}

// ── Scenario: guards stored in a component release on teardown ─────────

struct Listener<'a> {
    _subscriptions: Vec<Subscription<'a>>,
}

#[test]
fn guards_in_component_release_on_drop() {
    let hits = Cell::new(0u32);
    let tick: Emitter<'_, ()> = Emitter::new();
    let frame: Emitter<'_, (u64,)> = Emitter::new();

    let listener = Listener {
        _subscriptions: vec![
            tick.observable()
                .subscribe_scoped(Delegate::with_payload(|h: &Cell<u32>| h.set(h.get() + 1), &hits)),
            frame.observable().subscribe_scoped(Delegate::with_payload(
                |h: &Cell<u32>, _: u64| h.set(h.get() + 10),
                &hits,
            )),
        ],
    };

    tick.notify(());
    frame.notify((1,));
    assert_eq!(hits.get(), 11);

    drop(listener);
    tick.notify(());
    frame.notify((2,));
    assert_eq!(hits.get(), 11);
    assert!(tick.observable().is_empty());
    assert!(frame.observable().is_empty());
}

// ── Scenario: raw host table entry routed through a registry ───────────

struct HostSlot {
    last: Cell<i32>,
}

fn host_entry(payload: *const (), (value,): (i32,)) {
    // SAFETY: registered below with a pointer to a live HostSlot.
    let slot = unsafe { &*payload.cast::<HostSlot>() };
    slot.last.set(value);
}

#[test]
fn raw_entry_point_receives_payload() {
    let slot = HostSlot { last: Cell::new(0) };
    let r: Emitter<'_, (i32,)> = Emitter::new();

    // SAFETY: `host_entry` reads a HostSlot and `slot` outlives `r`'s use.
    let raw = unsafe { Delegate::from_raw(host_entry, std::ptr::from_ref(&slot).cast()) };
    r.observable().subscribe(raw);

    r.notify((55,));
    assert_eq!(slot.last.get(), 55);
}
