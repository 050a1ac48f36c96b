// Unsafe is confined to the delegate trampolines and raw subscription.
#![deny(unsafe_code)]

//! Core: allocation-free delegates and multicast observables.
//!
//! # Role in hookline
//! `hookline-core` is the dispatch layer host integrations build on. A host
//! callback table, a menu, or any other event source owns an [`Emitter`];
//! interested components subscribe [`Delegate`]s through its [`Observable`]
//! and keep a [`Subscription`] guard for as long as they want to listen.
//!
//! # Primary responsibilities
//! - **Delegate**: a two-word, `Copy` callable bound to a function, a method
//!   on a borrowed instance, or a raw trampoline, with no heap allocation and
//!   no dynamic dispatch.
//! - **Take**: the tag selecting how many leading arguments a candidate eats.
//! - **Observable / Emitter**: ordered multicast with per-registry ids and
//!   snapshot-before-deliver semantics.
//! - **Subscription**: move-only RAII guard removing one subscription.
//!
//! # Threading
//! Everything here is single-threaded: delegates carry raw payload pointers
//! and registries live behind `Rc<RefCell<..>>`, so none of these types are
//! `Send` or `Sync`.

pub mod candidate;
#[allow(unsafe_code)]
pub mod delegate;
#[cfg(feature = "logging")]
pub mod logging;
pub mod observable;
pub mod subscription;

pub use candidate::{Candidate, PayloadCandidate, Take};
pub use delegate::{Delegate, Trampoline};
pub use observable::{Emitter, Observable, SubscriptionId};
pub use subscription::{Subscription, Unsubscribe};
