//! Dependency Channels
//!
//! A `Dep` is the notification channel of one reactive slot. Every
//! intercepted property owns one, and every Observer owns one for
//! structural changes of its container (the "collection Dep").
//!
//! # Protocol
//!
//! 1. While a subscriber is the active target, reading a slot calls
//!    [`Dep::depend`], which hands the Dep to the subscriber.
//!
//! 2. The subscriber decides whether it already holds the Dep for this
//!    evaluation and calls [`Dep::add_sub`] if not.
//!
//! 3. Writing the slot calls [`Dep::notify`], which runs every subscriber's
//!    `update` to completion before returning.
//!
//! A Dep holds its subscribers weakly. A subscriber that has been dropped is
//! never updated again and its entry is pruned on the next `notify`.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;
use tracing::trace;

use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::Result;

/// Counter for generating unique Dep IDs.
static DEP_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique, creation-ordered identifier of a Dep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        Self(DEP_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

type SubscriberList = SmallVec<[Weak<dyn Subscriber>; 4]>;

struct DepInner {
    id: DepId,
    subs: RefCell<SubscriberList>,
}

/// A notification channel. Clones share the same subscriber list.
#[derive(Clone)]
pub struct Dep {
    inner: Rc<DepInner>,
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl Dep {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DepInner {
                id: DepId::next(),
                subs: RefCell::new(SmallVec::new()),
            }),
        }
    }

    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Append a subscriber. Callers are responsible for not registering the
    /// same subscriber twice.
    pub fn add_sub(&self, sub: Rc<dyn Subscriber>) {
        self.inner.subs.borrow_mut().push(Rc::downgrade(&sub));
    }

    /// Remove a subscriber by identity. No-op if it is not registered.
    pub fn remove_sub(&self, id: SubscriberId) {
        let mut subs = self.inner.subs.borrow_mut();
        let position = subs
            .iter()
            .position(|sub| sub.upgrade().is_some_and(|sub| sub.id() == id));
        if let Some(index) = position {
            subs.remove(index);
        }
    }

    /// Let the active target, if any, record this Dep as a dependency.
    pub fn depend(&self, runtime: &Runtime) {
        if let Some(target) = runtime.target() {
            target.add_dep(self);
        }
    }

    /// Run `update` on every subscriber.
    ///
    /// The subscriber list is snapshotted first, so subscribers may add or
    /// remove themselves while the cycle runs. In synchronous mode the
    /// snapshot is ordered by subscriber ID. The first failing update aborts
    /// the cycle and its error is returned.
    pub fn notify(&self, runtime: &Runtime) -> Result<()> {
        let mut subs: Vec<Rc<dyn Subscriber>> = {
            let mut list = self.inner.subs.borrow_mut();
            list.retain(|sub| sub.strong_count() > 0);
            list.iter().filter_map(Weak::upgrade).collect()
        };
        if !runtime.config().async_mode {
            subs.sort_by_key(|sub| sub.id());
        }

        trace!(dep = self.inner.id.raw(), subscribers = subs.len(), "notify");

        for sub in subs {
            sub.update()?;
        }
        Ok(())
    }

    /// Number of registered subscribers that are still alive.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subs
            .borrow()
            .iter()
            .filter(|sub| sub.strong_count() > 0)
            .count()
    }

    pub fn has_sub(&self, id: SubscriberId) -> bool {
        self.inner
            .subs
            .borrow()
            .iter()
            .any(|sub| sub.upgrade().is_some_and(|sub| sub.id() == id))
    }

    pub fn ptr_eq(&self, other: &Dep) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.inner.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::config::ReactiveConfig;
    use crate::reactive::probe::Probe;
    use crate::ReactiveError;

    #[test]
    fn dep_ids_are_monotonic() {
        let a = Dep::new();
        let b = Dep::new();
        assert!(a.id() < b.id());
    }

    #[test]
    fn depend_without_target_registers_nothing() {
        let runtime = Runtime::default();
        let dep = Dep::new();
        dep.depend(&runtime);
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn depend_hands_the_dep_to_the_active_target() {
        let runtime = Runtime::default();
        let dep = Dep::new();
        let probe = Probe::new();
        {
            let _guard = runtime.enter(probe.clone());
            dep.depend(&runtime);
            dep.depend(&runtime);
        }
        assert_eq!(dep.subscriber_count(), 1);
        assert_eq!(probe.dep_count(), 1);
    }

    #[test]
    fn remove_sub_is_a_noop_when_absent() {
        let dep = Dep::new();
        let probe = Probe::new();
        dep.add_sub(probe.clone());
        dep.remove_sub(SubscriberId::new());
        assert_eq!(dep.subscriber_count(), 1);
        dep.remove_sub(probe.id());
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let runtime = Runtime::default();
        let dep = Dep::new();
        let kept = Probe::new();
        let dropped = Probe::new();
        dep.add_sub(kept.clone());
        dep.add_sub(dropped.clone());
        drop(dropped);

        assert_eq!(dep.subscriber_count(), 1);
        dep.notify(&runtime).unwrap();
        assert_eq!(kept.updates(), 1);
        assert_eq!(dep.inner.subs.borrow().len(), 1);
    }

    #[test]
    fn synchronous_notify_orders_by_creation() {
        let runtime = Runtime::new(ReactiveConfig::synchronous());
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = Probe::with_log(log.clone());
        let second = Probe::with_log(log.clone());
        let third = Probe::with_log(log.clone());

        let dep = Dep::new();
        dep.add_sub(third.clone());
        dep.add_sub(first.clone());
        dep.add_sub(second.clone());

        dep.notify(&runtime).unwrap();
        assert_eq!(*log.borrow(), vec![first.id(), second.id(), third.id()]);
    }

    #[test]
    fn async_notify_keeps_registration_order() {
        let runtime = Runtime::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = Probe::with_log(log.clone());
        let second = Probe::with_log(log.clone());

        let dep = Dep::new();
        dep.add_sub(second.clone());
        dep.add_sub(first.clone());

        dep.notify(&runtime).unwrap();
        assert_eq!(*log.borrow(), vec![second.id(), first.id()]);
    }

    #[test]
    fn failing_subscriber_aborts_the_cycle() {
        let runtime = Runtime::new(ReactiveConfig::synchronous());
        let log = Rc::new(RefCell::new(Vec::new()));
        let failing = Probe::failing(log.clone());
        let after = Probe::with_log(log.clone());

        let dep = Dep::new();
        dep.add_sub(after.clone());
        dep.add_sub(failing.clone());

        let err = dep.notify(&runtime).unwrap_err();
        assert!(matches!(err, ReactiveError::Subscriber { .. }));
        assert_eq!(failing.updates(), 1);
        assert_eq!(after.updates(), 0);
    }
}
