//! Binding shapes accepted by [`Delegate`](crate::Delegate).
//!
//! A *candidate* is the callable a delegate is bound to. Two shapes exist:
//!
//! - [`Candidate`]: called with (a prefix of) the delegate's argument tuple.
//! - [`PayloadCandidate`]: called with a borrowed payload first, then (a
//!   prefix of) the argument tuple. Methods taking `&self` fit this shape
//!   directly as `Type::method`.
//!
//! Candidates may consume fewer arguments than the delegate signature
//! carries; trailing arguments are dropped. The [`Take`] tag records how many
//! leading arguments are consumed. It is inferred in practice because a
//! function item has exactly one arity, and can be spelled out when a
//! callable satisfies several shapes at once.
//!
//! Impls cover argument tuples of up to six elements.

/// Disambiguation tag: the candidate consumes the first `N` delegate
/// arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Take<const N: usize>;

/// A callable invocable with a prefix of the argument tuple `A`.
pub trait Candidate<A, R, M> {
    /// Call with the full tuple; arguments past the candidate's arity are dropped.
    fn call(&self, args: A) -> R;
}

/// A callable invocable with `&P` followed by a prefix of the argument tuple `A`.
pub trait PayloadCandidate<P, A, R, M> {
    /// Call with the payload and the full tuple.
    fn call_with(&self, payload: &P, args: A) -> R;
}

macro_rules! count {
    () => { 0 };
    ($head:ident $($tail:ident)*) => { 1 + count!($($tail)*) };
}

macro_rules! impl_candidate {
    ([$($all:ident)*] [$($used:ident)*]) => {
        impl<Func, Ret, $($all,)*> Candidate<($($all,)*), Ret, Take<{ count!($($used)*) }>> for Func
        where
            Func: Fn($($used),*) -> Ret,
        {
            #[inline(always)]
            #[allow(non_snake_case, unused_variables)]
            fn call(&self, ($($all,)*): ($($all,)*)) -> Ret {
                (self)($($used),*)
            }
        }

        impl<Func, Ret, Payload, $($all,)*>
            PayloadCandidate<Payload, ($($all,)*), Ret, Take<{ count!($($used)*) }>> for Func
        where
            Func: Fn(&Payload, $($used),*) -> Ret,
        {
            #[inline(always)]
            #[allow(non_snake_case, unused_variables)]
            fn call_with(&self, payload: &Payload, ($($all,)*): ($($all,)*)) -> Ret {
                (self)(payload, $($used),*)
            }
        }
    };
}

// Walks every prefix of the argument list, emitting one impl per prefix.
macro_rules! impl_candidates {
    (@step [$($all:ident)*] [$($used:ident)*] []) => {
        impl_candidate!([$($all)*] [$($used)*]);
    };
    (@step [$($all:ident)*] [$($used:ident)*] [$next:ident $($rest:ident)*]) => {
        impl_candidate!([$($all)*] [$($used)*]);
        impl_candidates!(@step [$($all)*] [$($used)* $next] [$($rest)*]);
    };
    ($($all:ident)*) => {
        impl_candidates!(@step [$($all)*] [] [$($all)*]);
    };
}

impl_candidates!();
impl_candidates!(A0);
impl_candidates!(A0 A1);
impl_candidates!(A0 A1 A2);
impl_candidates!(A0 A1 A2 A3);
impl_candidates!(A0 A1 A2 A3 A4);
impl_candidates!(A0 A1 A2 A3 A4 A5);
