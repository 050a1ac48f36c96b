#![forbid(unsafe_code)]

//! Scope-bound unsubscription.
//!
//! A [`Subscription`] owns the duty of removing one subscription id from one
//! registry. It is move-only, so exactly one guard is ever responsible for a
//! given `(registry, id)` pair; dropping it unsubscribes.
//!
//! The registry is held as `Rc<dyn Unsubscribe>`, so a single guard type
//! serves registries of any signature, and any owner type that knows how to
//! remove its own subscriptions can hand out guards too.

use std::fmt;
use std::rc::Rc;

use crate::observable::SubscriptionId;

/// Something that can remove a subscription by id.
///
/// Removing an absent id must be a no-op.
pub trait Unsubscribe {
    /// Remove the subscription carrying `id`.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// RAII guard for one subscription.
///
/// A default-constructed guard is unbound and does nothing on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Default)]
pub struct Subscription<'a> {
    binding: Option<(Rc<dyn Unsubscribe + 'a>, SubscriptionId)>,
}

impl fmt::Debug for Subscription<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

impl<'a> Subscription<'a> {
    /// Guard `id` on `owner`.
    pub fn new(owner: Rc<dyn Unsubscribe + 'a>, id: SubscriptionId) -> Self {
        Self {
            binding: Some((owner, id)),
        }
    }

    /// The guarded id, or `None` once released.
    #[must_use]
    pub fn id(&self) -> Option<SubscriptionId> {
        self.binding.as_ref().map(|(_, id)| *id)
    }

    /// Whether this guard still owns a subscription.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.binding.is_some()
    }

    /// Unsubscribe now. Later calls and the eventual drop do nothing.
    pub fn unsubscribe(&mut self) {
        if let Some((owner, id)) = self.binding.take() {
            owner.unsubscribe(id);
        }
    }

    /// Give up the guard without unsubscribing, returning the id so the
    /// caller can manage it by hand.
    pub fn detach(mut self) -> Option<SubscriptionId> {
        self.binding.take().map(|(_, id)| id)
    }
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
