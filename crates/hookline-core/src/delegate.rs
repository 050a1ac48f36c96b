//! Non-owning, allocation-free callable wrapper.
//!
//! # Design
//!
//! A [`Delegate`] is two machine words: a *trampoline* (a plain function
//! pointer with the fixed shape `unsafe fn(*const (), A) -> R`) and an opaque
//! *payload* pointer. The trampoline is monomorphized at the binding site,
//! where the candidate's concrete type is known; it rebuilds the candidate and
//! reinterprets the payload before forwarding the call. There is no boxed
//! closure and no vtable.
//!
//! Candidates must be stateless (`Copy` and zero-sized): function items,
//! methods named as `Type::method`, and closures that capture nothing. State
//! travels through the payload instead, which the delegate borrows for `'a`
//! and never owns.
//!
//! # Binding forms
//!
//! | Constructor | Candidate shape | Payload |
//! |-------------|-----------------|---------|
//! | [`Delegate::from_fn`] | `Fn(prefix of A) -> R` | none (null) |
//! | [`Delegate::with_payload`] | `Fn(&P, prefix of A) -> R` | `&'a P` |
//! | [`Delegate::from_raw`] | [`Trampoline<A, R>`] | any `*const ()` |
//!
//! # Failure Modes
//!
//! - **Stateful candidate**: rejected at compile time (a capturing closure or
//!   a runtime function pointer is not zero-sized).
//! - **Unbound invoke**: [`Delegate::invoke`] panics. Check
//!   [`Delegate::is_bound`] first or use [`Delegate::try_invoke`].

use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use crate::candidate::{Candidate, PayloadCandidate};

/// Fixed calling convention shared by every delegate of signature `A -> R`.
///
/// The first parameter is the delegate's payload pointer, which may be null.
pub type Trampoline<A, R> = unsafe fn(*const (), A) -> R;

/// A bound target invocable as `A -> R`, where `A` is the argument tuple.
///
/// `Delegate` is `Copy`. Equality is identity: two delegates are equal iff
/// they share the same trampoline and the same payload address.
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use hookline_core::Delegate;
///
/// fn add(a: i32, b: i32) -> i32 {
///     a + b
/// }
///
/// let sum: Delegate<'_, (i32, i32), i32> = Delegate::from_fn(add);
/// assert_eq!(sum.invoke((2, 3)), 5);
///
/// struct Counter {
///     hits: Cell<u32>,
/// }
///
/// impl Counter {
///     fn hit(&self, by: u32) {
///         self.hits.set(self.hits.get() + by);
///     }
/// }
///
/// let counter = Counter { hits: Cell::new(0) };
/// let on_hit: Delegate<'_, (u32,)> = Delegate::with_payload(Counter::hit, &counter);
/// on_hit.invoke((2,));
/// on_hit.invoke((3,));
/// assert_eq!(counter.hits.get(), 5);
/// ```
pub struct Delegate<'a, A, R = ()> {
    trampoline: Option<Trampoline<A, R>>,
    payload: *const (),
    _borrow: PhantomData<&'a ()>,
}

impl<A, R> Clone for Delegate<'_, A, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A, R> Copy for Delegate<'_, A, R> {}

impl<A, R> Default for Delegate<'_, A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> PartialEq for Delegate<'_, A, R> {
    fn eq(&self, other: &Self) -> bool {
        let same_target = match (self.trampoline, other.trampoline) {
            (Some(lhs), Some(rhs)) => ptr::fn_addr_eq(lhs, rhs),
            (None, None) => true,
            _ => false,
        };
        same_target && ptr::eq(self.payload, other.payload)
    }
}

impl<A, R> Eq for Delegate<'_, A, R> {}

impl<A, R> fmt::Debug for Delegate<'_, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("trampoline", &self.trampoline.map(|t| t as *const ()))
            .field("payload", &self.payload)
            .finish()
    }
}

impl<'a, A, R> Delegate<'a, A, R> {
    /// An unbound delegate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            trampoline: None,
            payload: ptr::null(),
            _borrow: PhantomData,
        }
    }

    /// Bind a stateless callable taking (a prefix of) the arguments.
    ///
    /// When the candidate takes exactly `A`, it is called directly even if
    /// its first parameter happens to be a receiver (`Type::method` with
    /// `A = (&Type, ..)`).
    #[must_use]
    pub fn from_fn<F, M>(candidate: F) -> Self
    where
        F: Candidate<A, R, M> + Copy,
    {
        let mut delegate = Self::new();
        delegate.bind(candidate);
        delegate
    }

    /// Bind a stateless callable receiving `payload` as its first argument.
    ///
    /// Covers both methods (`Type::method` bound to an instance) and free
    /// functions with a leading context parameter. The payload is borrowed,
    /// not owned; mutation goes through interior mutability.
    #[must_use]
    pub fn with_payload<P, F, M>(candidate: F, payload: &'a P) -> Self
    where
        F: PayloadCandidate<P, A, R, M> + Copy,
    {
        let mut delegate = Self::new();
        delegate.bind_with_payload(candidate, payload);
        delegate
    }

    /// Store a caller-supplied trampoline and payload as is.
    ///
    /// This is the interop path for callback tables assembled at runtime.
    ///
    /// # Safety
    ///
    /// Calling `trampoline` with `payload` and any `A` must be sound for as
    /// long as `'a` lasts, and for every copy of the returned delegate.
    #[must_use]
    pub const unsafe fn from_raw(trampoline: Trampoline<A, R>, payload: *const ()) -> Self {
        Self {
            trampoline: Some(trampoline),
            payload,
            _borrow: PhantomData,
        }
    }

    /// Rebind to a stateless callable, clearing any payload.
    pub fn bind<F, M>(&mut self, candidate: F)
    where
        F: Candidate<A, R, M> + Copy,
    {
        assert_stateless::<F>();
        let _ = candidate;
        self.trampoline = Some(call_free::<F, A, R, M>);
        self.payload = ptr::null();
    }

    /// Rebind to a stateless callable with a borrowed payload.
    pub fn bind_with_payload<P, F, M>(&mut self, candidate: F, payload: &'a P)
    where
        F: PayloadCandidate<P, A, R, M> + Copy,
    {
        assert_stateless::<F>();
        let _ = candidate;
        self.trampoline = Some(call_with_payload::<F, P, A, R, M>);
        self.payload = ptr::from_ref(payload).cast();
    }

    /// Rebind to a raw trampoline and payload.
    ///
    /// # Safety
    ///
    /// Same contract as [`Delegate::from_raw`].
    pub unsafe fn bind_raw(&mut self, trampoline: Trampoline<A, R>, payload: *const ()) {
        self.trampoline = Some(trampoline);
        self.payload = payload;
    }

    /// Clear the binding. Invoking afterwards is a contract violation.
    pub fn reset(&mut self) {
        self.trampoline = None;
        self.payload = ptr::null();
    }

    /// Whether a target is bound.
    #[inline]
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.trampoline.is_some()
    }

    /// The opaque payload (instance or context) pointer, possibly null.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> *const () {
        self.payload
    }

    /// The bound trampoline, if any.
    #[inline]
    #[must_use]
    pub fn trampoline(&self) -> Option<Trampoline<A, R>> {
        self.trampoline
    }

    /// Call the bound target.
    ///
    /// # Panics
    ///
    /// Panics if the delegate is unbound.
    #[inline]
    #[track_caller]
    pub fn invoke(&self, args: A) -> R {
        let Some(trampoline) = self.trampoline else {
            unbound_invoke();
        };
        // SAFETY: the safe binders pair each trampoline with the payload type
        // it reads, borrowed for `'a`; raw binders carry the same promise.
        unsafe { trampoline(self.payload, args) }
    }

    /// Call the bound target, or return `None` when unbound.
    #[inline]
    pub fn try_invoke(&self, args: A) -> Option<R> {
        self.is_bound().then(|| self.invoke(args))
    }
}

#[cold]
#[track_caller]
fn unbound_invoke() -> ! {
    panic!("invoked an unbound delegate")
}

#[inline(always)]
fn assert_stateless<F>() {
    const {
        assert!(
            size_of::<F>() == 0,
            "delegate candidates must be stateless: a fn item, a method path, or a non-capturing closure"
        );
    }
}

/// Rebuild a zero-sized candidate from nothing.
#[inline(always)]
fn conjure<F: Copy>() -> F {
    assert_stateless::<F>();
    // SAFETY: `F` is zero-sized, so a dangling well-aligned pointer is valid
    // for reads. A value of `F` was handed to the binder, and `Copy` permits
    // duplicating it.
    unsafe { NonNull::<F>::dangling().as_ptr().read() }
}

fn call_free<F, A, R, M>(_payload: *const (), args: A) -> R
where
    F: Candidate<A, R, M> + Copy,
{
    conjure::<F>().call(args)
}

/// # Safety
///
/// `payload` must point to a live `P`.
unsafe fn call_with_payload<F, P, A, R, M>(payload: *const (), args: A) -> R
where
    F: PayloadCandidate<P, A, R, M> + Copy,
{
    // SAFETY: `bind_with_payload` derived `payload` from a `&'a P`, and the
    // delegate cannot outlive `'a`.
    let payload = unsafe { &*payload.cast::<P>() };
    conjure::<F>().call_with(payload, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn add(a: i32, b: i32) -> i32 {
        a + b
    }

    fn mul(a: i32, b: i32) -> i32 {
        a * b
    }

    fn negate(a: i32) -> i32 {
        -a
    }

    struct Record {
        value: Cell<i32>,
    }

    impl Record {
        fn read(&self) -> i32 {
            self.value.get()
        }

        fn add_to(&self, delta: i32) -> i32 {
            self.value.get() + delta
        }
    }

    fn scaled(factor: &i32, a: i32) -> i32 {
        factor * a
    }

    #[test]
    fn default_is_unbound() {
        let d: Delegate<'_, (i32, i32), i32> = Delegate::default();
        assert!(!d.is_bound());
        assert!(d.payload().is_null());
        assert!(d.trampoline().is_none());
    }

    #[test]
    fn free_function_matches_direct_call() {
        let d: Delegate<'_, (i32, i32), i32> = Delegate::from_fn(add);
        assert!(d.is_bound());
        assert!(d.payload().is_null());
        assert_eq!(d.invoke((2, 40)), 42);
    }

    #[test]
    fn non_capturing_closure_binds() {
        let d: Delegate<'_, (i32, i32), i32> = Delegate::from_fn(|a: i32, b: i32| a - b);
        assert_eq!(d.invoke((10, 4)), 6);
    }

    #[test]
    fn shorter_candidate_ignores_trailing_args() {
        let d: Delegate<'_, (i32, &str), i32> = Delegate::from_fn(negate);
        assert_eq!(d.invoke((5, "unused")), -5);
    }

    #[test]
    fn unbound_method_takes_receiver_from_args() {
        let record = Record {
            value: Cell::new(3),
        };
        let d: Delegate<'_, (&Record, i32), i32> = Delegate::from_fn(Record::add_to);
        assert!(d.payload().is_null());
        assert_eq!(d.invoke((&record, 4)), 7);
    }

    #[test]
    fn bound_method_reads_current_state() {
        let record = Record {
            value: Cell::new(1),
        };
        let d: Delegate<'_, (), i32> = Delegate::with_payload(Record::read, &record);
        assert_eq!(d.invoke(()), 1);
        record.value.set(9);
        assert_eq!(d.invoke(()), 9);
    }

    #[test]
    fn free_function_with_payload() {
        let factor = 3;
        let d: Delegate<'_, (i32,), i32> = Delegate::with_payload(scaled, &factor);
        assert_eq!(d.payload(), ptr::from_ref(&factor).cast());
        assert_eq!(d.invoke((5,)), 15);
    }

    #[test]
    fn data_member_accessor() {
        let record = Record {
            value: Cell::new(12),
        };
        let d: Delegate<'_, (&Record,), i32> = Delegate::from_fn(|r: &Record| r.value.get());
        assert_eq!(d.invoke((&record,)), 12);
    }

    #[test]
    fn payload_mutation_through_refcell() {
        let log = RefCell::new(Vec::new());
        let d: Delegate<'_, (i32,)> =
            Delegate::with_payload(|log: &RefCell<Vec<i32>>, v: i32| log.borrow_mut().push(v), &log);
        d.invoke((1,));
        d.invoke((2,));
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn raw_binding_round_trips_payload() {
        fn raw(payload: *const (), (a,): (i32,)) -> i32 {
            // SAFETY: the test binds a pointer to a live i32.
            unsafe { *payload.cast::<i32>() + a }
        }
        let base = 100;
        // SAFETY: `raw` reads an i32 and `base` outlives the delegate.
        let d: Delegate<'_, (i32,), i32> =
            unsafe { Delegate::from_raw(raw, ptr::from_ref(&base).cast()) };
        assert_eq!(d.invoke((1,)), 101);
    }

    #[test]
    fn reset_clears_binding() {
        let mut d: Delegate<'_, (i32, i32), i32> = Delegate::from_fn(add);
        d.reset();
        assert!(!d.is_bound());
        assert_eq!(d, Delegate::new());
        assert_eq!(d.try_invoke((1, 2)), None);
    }

    #[test]
    fn rebind_replaces_target() {
        let mut d: Delegate<'_, (i32, i32), i32> = Delegate::from_fn(add);
        d.bind(mul);
        assert_eq!(d.invoke((3, 4)), 12);
    }

    #[test]
    fn equality_is_identity() {
        let a = 2;
        let b = 2;
        let first: Delegate<'_, (i32,), i32> = Delegate::with_payload(scaled, &a);
        let second: Delegate<'_, (i32,), i32> = Delegate::with_payload(scaled, &a);
        let other_payload: Delegate<'_, (i32,), i32> = Delegate::with_payload(scaled, &b);
        assert_eq!(first, second);
        assert_ne!(first, other_payload);

        let plain: Delegate<'_, (i32, i32), i32> = Delegate::from_fn(add);
        let copy = plain;
        assert_eq!(plain, copy);
        assert_ne!(plain, Delegate::from_fn(mul));
        assert_ne!(plain, Delegate::new());
    }

    #[test]
    fn try_invoke_on_bound() {
        let d: Delegate<'_, (i32, i32), i32> = Delegate::from_fn(add);
        assert_eq!(d.try_invoke((1, 1)), Some(2));
    }

    #[test]
    #[should_panic(expected = "invoked an unbound delegate")]
    fn invoking_unbound_panics() {
        let d: Delegate<'_, (i32,), i32> = Delegate::new();
        d.invoke((1,));
    }

    #[test]
    fn is_two_words() {
        assert_eq!(
            size_of::<Delegate<'_, (i32, i32), i32>>(),
            2 * size_of::<usize>()
        );
    }

    #[test]
    fn debug_lists_fields() {
        let d: Delegate<'_, (i32, i32), i32> = Delegate::from_fn(add);
        let dbg = format!("{d:?}");
        assert!(dbg.contains("Delegate"));
        assert!(dbg.contains("trampoline"));
        assert!(dbg.contains("payload"));
    }
}
