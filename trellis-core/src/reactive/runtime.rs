//! Reactive Runtime
//!
//! The runtime is the handle every reactive operation goes through. It owns
//! the state that would otherwise be ambient:
//!
//! - the [`ReactiveConfig`]
//! - the active target stack (which subscriber is collecting dependencies)
//! - the observation toggle (whether `observe` may create new Observers)
//!
//! A `Runtime` is cheap to clone; clones share the same state. The
//! reactivity model is single-threaded, so the runtime is neither `Send`
//! nor `Sync`.
//!
//! The entry points themselves are implemented next to the structures they
//! operate on: `observe` in `observer.rs`, `define_reactive` in
//! `property.rs`, and `set`/`del` in `mutate.rs`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::context::{TargetGuard, TargetStack};
use super::subscriber::Subscriber;
use crate::config::ReactiveConfig;

struct RuntimeInner {
    config: RefCell<ReactiveConfig>,
    targets: TargetStack,
    observing: Cell<bool>,
}

/// Shared handle to the reactive runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(ReactiveConfig::default())
    }
}

impl Runtime {
    pub fn new(config: ReactiveConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                config: RefCell::new(config),
                targets: TargetStack::default(),
                observing: Cell::new(true),
            }),
        }
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ReactiveConfig {
        self.inner.config.borrow().clone()
    }

    pub fn update_config(&self, f: impl FnOnce(&mut ReactiveConfig)) {
        f(&mut self.inner.config.borrow_mut());
    }

    pub(crate) fn diagnostics_enabled(&self) -> bool {
        self.inner.config.borrow().diagnostics_enabled()
    }

    /// Enable or disable creation of new Observers.
    ///
    /// Values that are already observed stay observed either way.
    pub fn toggle_observing(&self, value: bool) {
        self.inner.observing.set(value);
    }

    pub fn should_observe(&self) -> bool {
        self.inner.observing.get()
    }

    /// The subscriber currently collecting dependencies, if any.
    pub fn target(&self) -> Option<Rc<dyn Subscriber>> {
        self.inner.targets.current()
    }

    /// Check if a subscriber is collecting dependencies.
    pub fn is_tracking(&self) -> bool {
        self.target().is_some()
    }

    /// Make `target` the active subscriber, saving the previous one.
    ///
    /// Every push must be matched by a [`pop_target`](Self::pop_target) on
    /// all exit paths. Prefer [`enter`](Self::enter), which does that.
    pub fn push_target(&self, target: Option<Rc<dyn Subscriber>>) {
        self.inner.targets.push(target);
    }

    /// Restore the previously active subscriber.
    pub fn pop_target(&self) {
        self.inner.targets.pop();
    }

    pub(crate) fn target_depth(&self) -> usize {
        self.inner.targets.depth()
    }

    /// Make `target` the active subscriber until the guard is dropped.
    pub fn enter(&self, target: Rc<dyn Subscriber>) -> TargetGuard {
        TargetGuard::new(self.clone(), Some(target))
    }

    /// Run `f` with dependency collection suspended.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = TargetGuard::new(self.clone(), None);
        f()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &*self.inner.config.borrow())
            .field("observing", &self.inner.observing.get())
            .field("target_depth", &self.inner.targets.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::probe::Probe;

    #[test]
    fn observing_is_enabled_by_default() {
        let runtime = Runtime::default();
        assert!(runtime.should_observe());
        runtime.toggle_observing(false);
        assert!(!runtime.should_observe());
    }

    #[test]
    fn clones_share_state() {
        let runtime = Runtime::default();
        let clone = runtime.clone();
        clone.update_config(|config| config.production = true);
        assert!(runtime.config().production);

        let probe = Probe::new();
        let _guard = clone.enter(probe.clone());
        assert!(runtime.is_tracking());
    }

    #[test]
    fn untracked_suspends_the_target() {
        let runtime = Runtime::default();
        let probe = Probe::new();
        let _guard = runtime.enter(probe.clone());

        let tracking_inside = runtime.untracked(|| runtime.is_tracking());
        assert!(!tracking_inside);
        assert!(runtime.is_tracking());
    }
}
