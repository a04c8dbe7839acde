//! Watcher Implementation
//!
//! A Watcher is the reference [`Subscriber`]: it evaluates a getter while
//! acting as the active target, remembers which Deps the getter touched, and
//! re-evaluates when any of them notifies.
//!
//! # How Watchers Work
//!
//! 1. On creation (unless lazy), the getter runs to establish initial
//!    dependencies.
//!
//! 2. During each evaluation, Deps are collected into a fresh set. A Dep
//!    touched several times is recorded once.
//!
//! 3. After the evaluation, the watcher unsubscribes from every Dep it held
//!    before but did not touch this time, then swaps the fresh set in.
//!
//! # Lazy Watchers
//!
//! A lazy watcher backs a computed value. `update` only marks it dirty; the
//! next [`read`](Watcher::read) re-evaluates and, when another subscriber is
//! active, forwards the lazy watcher's Deps to that subscriber.
//!
//! # Scheduling
//!
//! `update` runs synchronously. Batching and deduplication across a tick
//! belong to a scheduler layered on top.
//!
//! # Lifetime
//!
//! Deps only hold watchers weakly, so a watcher lives as long as its owner
//! keeps the returned `Rc`. Dropping it stops further runs just like
//! [`teardown`](Watcher::teardown) does.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use super::dep::{Dep, DepId};
use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};
use super::traverse::traverse;
use crate::error::Result;
use crate::value::Value;

type WatchGetter = Box<dyn Fn(&Runtime) -> Result<Value>>;
type WatchCallback = Box<dyn Fn(&Value, &Value) -> Result<()>>;

/// Options for creating a [`Watcher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WatcherOptions {
    /// Traverse the produced value so nested changes also trigger.
    pub deep: bool,

    /// Do not evaluate until read; `update` only marks the watcher dirty.
    pub lazy: bool,
}

/// A computation that re-runs when the reactive values it read change.
pub struct Watcher {
    id: SubscriberId,
    this: Weak<Watcher>,
    runtime: Runtime,
    getter: WatchGetter,
    callback: Option<WatchCallback>,
    options: WatcherOptions,
    value: RefCell<Value>,
    dirty: Cell<bool>,
    active: Cell<bool>,
    deps: RefCell<Vec<Dep>>,
    dep_ids: RefCell<HashSet<DepId>>,
    new_deps: RefCell<Vec<Dep>>,
    new_dep_ids: RefCell<HashSet<DepId>>,
    run_count: Cell<usize>,
}

impl Watcher {
    /// Create a watcher and, unless it is lazy, evaluate it immediately.
    pub fn new<F>(runtime: &Runtime, getter: F, options: WatcherOptions) -> Result<Rc<Self>>
    where
        F: Fn(&Runtime) -> Result<Value> + 'static,
    {
        Self::build(runtime, Box::new(getter), None, options)
    }

    /// Create a watcher that calls `callback(new, old)` after each re-run
    /// that produced a different value (or any object value, or in deep mode).
    pub fn with_callback<F, C>(
        runtime: &Runtime,
        getter: F,
        callback: C,
        options: WatcherOptions,
    ) -> Result<Rc<Self>>
    where
        F: Fn(&Runtime) -> Result<Value> + 'static,
        C: Fn(&Value, &Value) -> Result<()> + 'static,
    {
        Self::build(runtime, Box::new(getter), Some(Box::new(callback)), options)
    }

    fn build(
        runtime: &Runtime,
        getter: WatchGetter,
        callback: Option<WatchCallback>,
        options: WatcherOptions,
    ) -> Result<Rc<Self>> {
        let watcher = Rc::new_cyclic(|this| Self {
            id: SubscriberId::new(),
            this: this.clone(),
            runtime: runtime.clone(),
            getter,
            callback,
            options,
            value: RefCell::new(Value::Undefined),
            dirty: Cell::new(options.lazy),
            active: Cell::new(true),
            deps: RefCell::new(Vec::new()),
            dep_ids: RefCell::new(HashSet::new()),
            new_deps: RefCell::new(Vec::new()),
            new_dep_ids: RefCell::new(HashSet::new()),
            run_count: Cell::new(0),
        });

        if !options.lazy {
            let value = watcher.get()?;
            *watcher.value.borrow_mut() = value;
        }
        Ok(watcher)
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Evaluate the getter as the active target and collect dependencies.
    ///
    /// The previous target is restored and stale dependencies are dropped
    /// even when the getter fails.
    pub fn get(&self) -> Result<Value> {
        let result = match self.this.upgrade() {
            Some(this) => {
                let _guard = self.runtime.enter(this);
                let result = (self.getter)(&self.runtime);
                if let (Ok(value), true) = (&result, self.options.deep) {
                    traverse(&self.runtime, value);
                }
                result
            }
            None => (self.getter)(&self.runtime),
        };
        self.cleanup_deps();
        self.run_count.set(self.run_count.get() + 1);
        result
    }

    /// Re-evaluate and fire the callback if the value changed.
    pub fn run(&self) -> Result<()> {
        if !self.active.get() {
            return Ok(());
        }

        let value = self.get()?;
        let old = self.value.replace(value.clone());
        let changed = !value.strict_eq(&old) || value.is_object_like() || self.options.deep;
        if changed {
            if let Some(callback) = &self.callback {
                callback(&value, &old)?;
            }
        }
        Ok(())
    }

    /// Evaluate a lazy watcher and clear its dirty flag.
    pub fn evaluate(&self) -> Result<Value> {
        let value = self.get()?;
        *self.value.borrow_mut() = value.clone();
        self.dirty.set(false);
        Ok(value)
    }

    /// Read the watcher as a computed value.
    ///
    /// Re-evaluates if dirty. If another subscriber is active, it is made to
    /// depend on everything this watcher depends on.
    pub fn read(&self) -> Result<Value> {
        if self.dirty.get() {
            self.evaluate()?;
        }
        if self.runtime.is_tracking() {
            self.depend();
        }
        Ok(self.value.borrow().clone())
    }

    /// Forward every Dep of this watcher to the active target.
    pub fn depend(&self) {
        let deps = self.deps.borrow().clone();
        for dep in deps {
            dep.depend(&self.runtime);
        }
    }

    /// Unsubscribe from every Dep. The watcher never runs again.
    pub fn teardown(&self) {
        if self.active.replace(false) {
            for dep in self.deps.borrow().iter() {
                dep.remove_sub(self.id);
            }
        }
    }

    /// The most recently computed value.
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Number of times the getter has been evaluated.
    pub fn run_count(&self) -> usize {
        self.run_count.get()
    }

    /// Number of distinct Deps collected by the last evaluation.
    pub fn dependency_count(&self) -> usize {
        self.deps.borrow().len()
    }

    fn cleanup_deps(&self) {
        {
            let fresh = self.new_dep_ids.borrow();
            for dep in self.deps.borrow().iter() {
                if !fresh.contains(&dep.id()) {
                    dep.remove_sub(self.id);
                }
            }
        }

        std::mem::swap(&mut *self.dep_ids.borrow_mut(), &mut *self.new_dep_ids.borrow_mut());
        self.new_dep_ids.borrow_mut().clear();
        std::mem::swap(&mut *self.deps.borrow_mut(), &mut *self.new_deps.borrow_mut());
        self.new_deps.borrow_mut().clear();
    }
}

impl Subscriber for Watcher {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(self: Rc<Self>, dep: &Dep) {
        let id = dep.id();
        if !self.new_dep_ids.borrow_mut().insert(id) {
            return;
        }
        self.new_deps.borrow_mut().push(dep.clone());
        if !self.dep_ids.borrow().contains(&id) {
            dep.add_sub(self);
        }
    }

    fn update(&self) -> Result<()> {
        if self.options.lazy {
            self.dirty.set(true);
            Ok(())
        } else {
            self.run()
        }
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReactiveError;
    use crate::value::ObjectRef;

    fn state(runtime: &Runtime) -> ObjectRef {
        let obj = ObjectRef::from_entries([
            ("a", Value::from(1)),
            ("b", Value::from(2)),
            ("flag", Value::from(true)),
        ]);
        runtime.observe(&Value::from(obj.clone()), false);
        obj
    }

    fn watch_a(runtime: &Runtime, obj: &ObjectRef) -> Rc<Watcher> {
        let reader = obj.clone();
        Watcher::new(
            runtime,
            move |rt| Ok(reader.get(rt, "a")),
            WatcherOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn watcher_runs_on_creation() {
        let runtime = Runtime::default();
        let obj = state(&runtime);
        let watcher = watch_a(&runtime, &obj);

        assert_eq!(watcher.run_count(), 1);
        assert_eq!(watcher.value().as_number(), Some(1.0));
        assert_eq!(watcher.dependency_count(), 1);
    }

    #[test]
    fn watcher_reruns_when_a_dependency_changes() {
        let runtime = Runtime::default();
        let obj = state(&runtime);
        let watcher = watch_a(&runtime, &obj);

        obj.put(&runtime, "a", Value::from(5)).unwrap();
        assert_eq!(watcher.run_count(), 2);
        assert_eq!(watcher.value().as_number(), Some(5.0));

        obj.put(&runtime, "b", Value::from(9)).unwrap();
        assert_eq!(watcher.run_count(), 2);
    }

    #[test]
    fn repeated_reads_record_one_dependency() {
        let runtime = Runtime::default();
        let obj = state(&runtime);
        let reader = obj.clone();
        let watcher = Watcher::new(
            &runtime,
            move |rt| {
                reader.get(rt, "a");
                reader.get(rt, "a");
                Ok(reader.get(rt, "a"))
            },
            WatcherOptions::default(),
        )
        .unwrap();

        assert_eq!(watcher.dependency_count(), 1);
        obj.put(&runtime, "a", Value::from(2)).unwrap();
        assert_eq!(watcher.run_count(), 2);
    }

    #[test]
    fn stale_dependencies_are_dropped() {
        let runtime = Runtime::default();
        let obj = state(&runtime);
        let reader = obj.clone();
        let watcher = Watcher::new(
            &runtime,
            move |rt| {
                let flag = reader.get(rt, "flag");
                Ok(if matches!(flag, Value::Bool(true)) {
                    reader.get(rt, "a")
                } else {
                    reader.get(rt, "b")
                })
            },
            WatcherOptions::default(),
        )
        .unwrap();

        obj.put(&runtime, "flag", Value::from(false)).unwrap();
        assert_eq!(watcher.run_count(), 2);

        // `a` is no longer read, so writing it does nothing.
        obj.put(&runtime, "a", Value::from(100)).unwrap();
        assert_eq!(watcher.run_count(), 2);

        obj.put(&runtime, "b", Value::from(100)).unwrap();
        assert_eq!(watcher.run_count(), 3);
    }

    #[test]
    fn callback_receives_new_and_old_values() {
        let runtime = Runtime::default();
        let obj = state(&runtime);
        let reader = obj.clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _watcher = Watcher::with_callback(
            &runtime,
            move |rt| Ok(reader.get(rt, "a")),
            move |new, old| {
                sink.borrow_mut().push((new.as_number(), old.as_number()));
                Ok(())
            },
            WatcherOptions::default(),
        )
        .unwrap();

        obj.put(&runtime, "a", Value::from(3)).unwrap();
        assert_eq!(*seen.borrow(), vec![(Some(3.0), Some(1.0))]);
    }

    #[test]
    fn teardown_stops_updates() {
        let runtime = Runtime::default();
        let obj = state(&runtime);
        let watcher = watch_a(&runtime, &obj);

        watcher.teardown();
        assert!(!watcher.is_active());
        obj.put(&runtime, "a", Value::from(2)).unwrap();
        assert_eq!(watcher.run_count(), 1);
    }

    #[test]
    fn dropped_watcher_stops_running() {
        let runtime = Runtime::default();
        let obj = state(&runtime);
        let reader = obj.clone();
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let watcher = Watcher::new(
            &runtime,
            move |rt| {
                counter.set(counter.get() + 1);
                Ok(reader.get(rt, "a"))
            },
            WatcherOptions::default(),
        )
        .unwrap();

        drop(watcher);
        obj.put(&runtime, "a", Value::from(2)).unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn lazy_watcher_evaluates_on_read() {
        let runtime = Runtime::default();
        let obj = state(&runtime);
        let reader = obj.clone();
        let computed = Watcher::new(
            &runtime,
            move |rt| {
                let a = reader.get(rt, "a").as_number().unwrap_or_default();
                let b = reader.get(rt, "b").as_number().unwrap_or_default();
                Ok(Value::from(a + b))
            },
            WatcherOptions {
                lazy: true,
                ..WatcherOptions::default()
            },
        )
        .unwrap();

        assert_eq!(computed.run_count(), 0);
        assert!(computed.is_dirty());
        assert_eq!(computed.read().unwrap().as_number(), Some(3.0));
        assert_eq!(computed.read().unwrap().as_number(), Some(3.0));
        assert_eq!(computed.run_count(), 1);

        obj.put(&runtime, "a", Value::from(10)).unwrap();
        assert!(computed.is_dirty());
        assert_eq!(computed.run_count(), 1);
        assert_eq!(computed.read().unwrap().as_number(), Some(12.0));
    }

    #[test]
    fn failing_getter_restores_the_target() {
        let runtime = Runtime::default();
        let result = Watcher::new(
            &runtime,
            |_| Err(ReactiveError::subscriber(0, "boom")),
            WatcherOptions::default(),
        );
        assert!(result.is_err());
        assert!(!runtime.is_tracking());
    }
}
