//! Listener records, scope filtering, and unsubscribe handles.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::event_bus::{BusInner, EventBus};
use super::{Event, ListenerId};

/// Callback invoked for each matching event.
///
/// Returning `Err` (or panicking) marks the delivery to this listener as
/// failed; other listeners still run.
pub type ListenerFn = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// Set of event names a listener receives.
///
/// Fixed at subscription time; later registrations do not widen it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerScope {
    /// Every event published on the bus, registered or not.
    All,
    /// Only the named events.
    Only(HashSet<String>),
}

impl ListenerScope {
    /// Builds a scope from a list of names; an empty list means [`Self::All`].
    #[must_use]
    pub fn from_names(names: &[&str]) -> Self {
        if names.is_empty() {
            Self::All
        } else {
            Self::Only(names.iter().map(|n| (*n).to_string()).collect())
        }
    }

    /// Returns `true` if an event with this name passes the filter.
    #[must_use]
    pub fn matches(&self, event_name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.contains(event_name),
        }
    }
}

pub(crate) struct ListenerEntry {
    pub(crate) id: ListenerId,
    pub(crate) scope: ListenerScope,
    pub(crate) callback: ListenerFn,
    active: AtomicBool,
}

impl ListenerEntry {
    pub(crate) fn new(id: ListenerId, scope: ListenerScope, callback: ListenerFn) -> Self {
        Self {
            id,
            scope,
            callback,
            active: AtomicBool::new(true),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Active and interested in `event_name`.
    pub(crate) fn accepts(&self, event_name: &str) -> bool {
        self.is_active() && self.scope.matches(event_name)
    }
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Dropping the handle does not unsubscribe. The handle holds the bus
/// weakly, so a listener may capture its own subscription without keeping
/// the bus alive.
///
/// A listener that captures a strong [`EventBus`] clone forms a reference
/// cycle through the bus's listener list, and the bus is never freed.
/// Capture [`EventBus::downgrade`] or the `Subscription` instead.
#[derive(Clone)]
pub struct Subscription {
    bus: Weak<BusInner>,
    id: ListenerId,
}

impl Subscription {
    pub(crate) fn new(bus: &Arc<BusInner>, id: ListenerId) -> Self {
        Self {
            bus: Arc::downgrade(bus),
            id,
        }
    }

    /// Identifier for out-of-band [`EventBus::unsubscribe`] calls.
    #[must_use]
    pub fn id(&self) -> &ListenerId {
        &self.id
    }

    /// Removes this listener from its bus.
    ///
    /// Returns `false` if it was already removed or the bus is gone.
    pub fn unsubscribe(&self) -> bool {
        self.bus
            .upgrade()
            .is_some_and(|inner| EventBus::from_inner(inner).unsubscribe(&self.id))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("bus_alive", &(self.bus.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_names_match_everything() {
        let scope = ListenerScope::from_names(&[]);
        assert_eq!(scope, ListenerScope::All);
        assert!(scope.matches("tick"));
        assert!(scope.matches("never-registered"));
    }

    #[test]
    fn explicit_scope_matches_members_only() {
        let scope = ListenerScope::from_names(&["tick", "tock"]);
        assert!(scope.matches("tick"));
        assert!(scope.matches("tock"));
        assert!(!scope.matches("tack"));
    }

    #[test]
    fn deactivated_entry_accepts_nothing() {
        let callback: ListenerFn = Arc::new(|_: &Event| -> anyhow::Result<()> { Ok(()) });
        let entry = ListenerEntry::new(ListenerId::from("l-1"), ListenerScope::All, callback);
        assert!(entry.accepts("tick"));
        entry.deactivate();
        assert!(!entry.accepts("tick"));
    }
}
