//! Multicast subscription registry over [`Delegate`]s.
//!
//! # Design
//!
//! [`Observable<A, R>`] is a shared handle (`Rc<RefCell<..>>`) to an
//! insertion-ordered list of `(SubscriptionId, Delegate)` records. Anyone
//! holding a handle can subscribe and unsubscribe. Delivery belongs to the
//! [`Emitter<A, R>`] that created the registry: owners keep the emitter
//! private and hand out [`Emitter::observable`].
//!
//! # Invariants
//!
//! 1. Subscribers are notified in subscribe order.
//! 2. Ids come from a per-registry counter starting at 0. They are unique
//!    among the live records of one registry and mean nothing elsewhere.
//! 3. A notify call delivers to exactly the records present when it started:
//!    the delegate list is copied before the first invocation.
//! 4. No `RefCell` borrow is held while a subscriber runs.
//!
//! # Performance
//!
//! | Operation     | Complexity                                   |
//! |---------------|----------------------------------------------|
//! | `subscribe()` | O(1) amortized                               |
//! | `unsubscribe()` | O(S) where S = subscribers                 |
//! | `notify()`    | O(S), snapshot is inline up to 8 subscribers |
//!
//! # Failure Modes
//!
//! - **Panicking subscriber**: the panic propagates out of `notify()` and
//!   later subscribers are skipped. The registry itself stays consistent.
//! - **Failing subscriber**: with `R = Result<(), E>`, `try_notify()` stops
//!   at the first `Err` and returns it.
//! - **Absent id**: `unsubscribe()` is a no-op.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::candidate::{Candidate, PayloadCandidate};
use crate::delegate::{Delegate, Trampoline};
use crate::subscription::{Subscription, Unsubscribe};

/// Delegates copied out for one delivery pass.
type Snapshot<'a, A, R> = SmallVec<[Delegate<'a, A, R>; 8]>;

/// Opaque handle naming one subscription inside the registry that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(i32);

impl SubscriptionId {
    /// Wrap a raw id, e.g. one round-tripped through a host callback table.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw 32-bit value.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Record<'a, A, R> {
    id: SubscriptionId,
    delegate: Delegate<'a, A, R>,
}

/// Shared interior for [`Observable`].
struct Registry<'a, A, R> {
    records: Vec<Record<'a, A, R>>,
    next_id: i32,
    /// Set once the counter has wrapped; from then on live ids are skipped.
    wrapped: bool,
    label: &'static str,
}

impl<A, R> Registry<'_, A, R> {
    fn issue_id(&mut self) -> SubscriptionId {
        loop {
            let id = self.next_id;
            self.next_id = match id.checked_add(1) {
                Some(next) => next,
                None => {
                    self.wrapped = true;
                    0
                }
            };
            if !self.wrapped || !self.records.iter().any(|r| r.id.0 == id) {
                return SubscriptionId(id);
            }
        }
    }

    fn remove(&mut self, id: SubscriptionId) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        before - self.records.len()
    }
}

impl<A, R> Unsubscribe for RefCell<Registry<'_, A, R>> {
    fn unsubscribe(&self, id: SubscriptionId) {
        let mut registry = self.borrow_mut();
        let removed = registry.remove(id);
        trace!(observable = registry.label, %id, removed, "unsubscribe");
    }
}

/// Shared handle to a multicast registry.
///
/// Cloning an `Observable` creates a new handle to the **same** registry.
pub struct Observable<'a, A, R = ()> {
    inner: Rc<RefCell<Registry<'a, A, R>>>,
}

// Manual Clone: shares the same Rc.
impl<A, R> Clone for Observable<'_, A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A, R> fmt::Debug for Observable<'_, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("label", &inner.label)
            .field("subscriber_count", &inner.records.len())
            .field("next_id", &inner.next_id)
            .finish()
    }
}

impl<'a, A, R> Observable<'a, A, R> {
    fn with_label(label: &'static str) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                records: Vec::new(),
                next_id: 0,
                wrapped: false,
                label,
            })),
        }
    }

    /// Append a delegate and return its id.
    pub fn subscribe(&self, delegate: Delegate<'a, A, R>) -> SubscriptionId {
        let mut registry = self.inner.borrow_mut();
        if !delegate.is_bound() {
            warn!(
                observable = registry.label,
                "subscribing an unbound delegate; notify will panic when it is reached"
            );
        }
        let id = registry.issue_id();
        registry.records.push(Record { id, delegate });
        trace!(
            observable = registry.label,
            %id,
            subscribers = registry.records.len(),
            "subscribe"
        );
        id
    }

    /// Bind a stateless callable and subscribe it.
    pub fn subscribe_fn<F, M>(&self, candidate: F) -> SubscriptionId
    where
        F: Candidate<A, R, M> + Copy,
    {
        self.subscribe(Delegate::from_fn(candidate))
    }

    /// Bind a stateless callable to a borrowed payload and subscribe it.
    pub fn subscribe_with_payload<P, F, M>(&self, candidate: F, payload: &'a P) -> SubscriptionId
    where
        F: PayloadCandidate<P, A, R, M> + Copy,
    {
        self.subscribe(Delegate::with_payload(candidate, payload))
    }

    /// Subscribe a caller-supplied trampoline and payload.
    ///
    /// # Safety
    ///
    /// Same contract as [`Delegate::from_raw`]: calling `trampoline` with
    /// `payload` must stay sound for as long as the record can be notified.
    #[allow(unsafe_code)]
    pub unsafe fn subscribe_raw(
        &self,
        trampoline: Trampoline<A, R>,
        payload: *const (),
    ) -> SubscriptionId {
        // SAFETY: forwarded to the caller.
        self.subscribe(unsafe { Delegate::from_raw(trampoline, payload) })
    }

    /// Remove every record carrying `id`. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        Unsubscribe::unsubscribe(&*self.inner, id);
    }

    /// Whether `id` is currently registered.
    #[must_use]
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.inner.borrow().records.iter().any(|r| r.id == id)
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().records.len()
    }

    /// Whether no subscriber is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().records.is_empty()
    }

    /// Drop every subscription. The id counter keeps running.
    pub fn clear(&self) {
        let mut registry = self.inner.borrow_mut();
        trace!(
            observable = registry.label,
            removed = registry.records.len(),
            "clear"
        );
        registry.records.clear();
    }

    fn snapshot(&self) -> Snapshot<'a, A, R> {
        self.inner
            .borrow()
            .records
            .iter()
            .map(|r| r.delegate)
            .collect()
    }

    fn label(&self) -> &'static str {
        self.inner.borrow().label
    }
}

impl<'a, A: 'a, R: 'a> Observable<'a, A, R> {
    /// Subscribe and tie the subscription to the returned guard.
    pub fn subscribe_scoped(&self, delegate: Delegate<'a, A, R>) -> Subscription<'a> {
        let id = self.subscribe(delegate);
        self.guard(id)
    }

    /// A guard that unsubscribes `id` from this registry when dropped.
    pub fn guard(&self, id: SubscriptionId) -> Subscription<'a> {
        let owner: Rc<dyn Unsubscribe + 'a> = self.inner.clone();
        Subscription::new(owner, id)
    }
}

impl<A, R> Unsubscribe for Observable<'_, A, R> {
    fn unsubscribe(&self, id: SubscriptionId) {
        Observable::unsubscribe(self, id);
    }
}

/// Owning side of a registry: the only holder allowed to deliver.
///
/// # Examples
///
/// ```
/// use std::cell::RefCell;
/// use hookline_core::Emitter;
///
/// let seen = RefCell::new(Vec::new());
/// let emitter: Emitter<'_, (i32,)> = Emitter::new();
/// emitter
///     .observable()
///     .subscribe_with_payload(|seen: &RefCell<Vec<i32>>, v: i32| seen.borrow_mut().push(v), &seen);
///
/// emitter.notify((7,));
/// assert_eq!(*seen.borrow(), vec![7]);
/// ```
pub struct Emitter<'a, A, R = ()> {
    observable: Observable<'a, A, R>,
}

impl<A, R> Default for Emitter<'_, A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> fmt::Debug for Emitter<'_, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("observable", &self.observable)
            .finish()
    }
}

impl<'a, A, R> Emitter<'a, A, R> {
    /// An emitter over a fresh, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_label("")
    }

    /// An emitter whose log records carry `label`.
    #[must_use]
    pub fn with_label(label: &'static str) -> Self {
        Self {
            observable: Observable::with_label(label),
        }
    }

    /// The subscribe/unsubscribe surface of this emitter's registry.
    #[must_use]
    pub fn observable(&self) -> &Observable<'a, A, R> {
        &self.observable
    }
}

impl<A: Clone> Emitter<'_, A, ()> {
    /// Invoke every subscriber present at call time, in subscribe order.
    ///
    /// # Panics
    ///
    /// Propagates a subscriber's panic (remaining subscribers are skipped),
    /// and panics on reaching an unbound delegate.
    pub fn notify(&self, args: A) {
        let snapshot = self.observable.snapshot();
        trace!(
            observable = self.observable.label(),
            subscribers = snapshot.len(),
            "notify"
        );
        for delegate in &snapshot {
            delegate.invoke(args.clone());
        }
    }
}

impl<A: Clone, E> Emitter<'_, A, Result<(), E>> {
    /// Invoke every subscriber present at call time, in subscribe order,
    /// stopping at and returning the first error.
    pub fn try_notify(&self, args: A) -> Result<(), E> {
        let snapshot = self.observable.snapshot();
        trace!(
            observable = self.observable.label(),
            subscribers = snapshot.len(),
            "try_notify"
        );
        for delegate in &snapshot {
            delegate.invoke(args.clone())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
