//! Subscriber types for the reactive system.
//!
//! A Subscriber represents any computation that depends on reactive values:
//! watchers, computed values, render functions. The core only ever talks to
//! subscribers through the [`Subscriber`] trait.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::dep::Dep;
use crate::error::Result;

/// Unique identifier for a subscriber.
///
/// IDs are handed out in creation order. When notifications are delivered
/// synchronously, subscribers run in ascending ID order, so a computation
/// created before another (a parent before its child) runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A computation that can depend on [`Dep`]s and be asked to update.
pub trait Subscriber {
    /// The subscriber's creation-ordered ID. Also its identity inside a Dep.
    fn id(&self) -> SubscriberId;

    /// Called by [`Dep::depend`] while this subscriber is the active target.
    ///
    /// The Dep does not add itself to the subscriber: the subscriber decides
    /// whether it already knows this Dep in the current evaluation and calls
    /// [`Dep::add_sub`] only when it does not.
    fn add_dep(self: Rc<Self>, dep: &Dep);

    /// A dependency changed. Errors abort the rest of the notify cycle.
    fn update(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_ids_follow_creation_order() {
        let first = SubscriberId::new();
        let second = SubscriberId::new();
        assert!(first < second);
        assert!(first.raw() < second.raw());
    }
}
