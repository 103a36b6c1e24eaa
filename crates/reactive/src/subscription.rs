//! Subscription handles for live queries.
//!
//! This module provides subscription IDs, the subscription state machine and
//! the handle returned to callers, which is the only way to cancel a live
//! query.

use crate::registry::RegistryState;
use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Lifecycle of a subscription.
///
/// `Created -> Pending -> Active -> (Unsubscribed | Errored)`. `Pending` may
/// also go straight to either terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Constructed, not yet registered.
    Created,
    /// Registered; the initial emission has not been delivered yet.
    Pending,
    /// At least one emission delivered.
    Active,
    /// Cancelled by the caller or by registry shutdown.
    Unsubscribed,
    /// Terminated by a query error.
    Errored,
}

impl SubscriptionState {
    /// Returns true for `Unsubscribed` and `Errored`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, SubscriptionState::Unsubscribed | SubscriptionState::Errored)
    }

    /// Returns true if results may still be delivered.
    #[inline]
    pub fn is_live(self) -> bool {
        matches!(self, SubscriptionState::Pending | SubscriptionState::Active)
    }
}

/// State shared between a handle and the registry.
pub(crate) type SharedState = Rc<Cell<SubscriptionState>>;

/// A handle to a live query.
///
/// Dropping the handle does not cancel the subscription; call
/// `unsubscribe()`.
pub struct Subscription {
    /// Unique identifier
    id: SubscriptionId,
    /// State shared with the registry
    state: SharedState,
    /// Registry that owns the query units
    registry: Weak<RefCell<RegistryState>>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        state: SharedState,
        registry: Weak<RefCell<RegistryState>>,
    ) -> Self {
        Self {
            id,
            state,
            registry,
        }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> SubscriptionState {
        self.state.get()
    }

    /// Returns true if results may still be delivered.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.state.get().is_live()
    }

    /// Cancels the subscription. Idempotent.
    ///
    /// No callback fires after this returns. A recomputation already running
    /// completes but its result is dropped.
    pub fn unsubscribe(&self) {
        if self.state.get().is_terminal() {
            return;
        }
        self.state.set(SubscriptionState::Unsubscribed);
        if let Some(registry) = self.registry.upgrade() {
            // Can only fail if the registry already forgot this id.
            let _ = RegistryState::unregister(&registry, self.id);
        }
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("state", &self.state.get())
            .finish()
    }
}
