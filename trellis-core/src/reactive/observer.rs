//! Observers
//!
//! An Observer marks an object or array as converted to reactive form and
//! owns the container's collection Dep, which is notified on structural
//! changes (keys added or removed, elements pushed or spliced).
//!
//! # Conversion
//!
//! - Objects: every own enumerable key becomes a reactive property, and the
//!   held values are observed recursively.
//! - Arrays: indices are not intercepted. Elements are observed, and the
//!   mutating methods notify the collection Dep instead.
//!
//! The Observer is attached before its children are walked, so cyclic
//! graphs terminate: the second visit finds the marker and stops.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::dep::Dep;
use super::property::ReactiveOptions;
use super::runtime::Runtime;
use crate::value::{ArrayRef, ObjectKind, ObjectRef, Value, WeakArrayRef, WeakObjectRef};

#[derive(Clone)]
enum Observed {
    Object(WeakObjectRef),
    Array(WeakArrayRef),
}

/// Reactive marker and collection Dep of one object or array.
pub struct Observer {
    value: Observed,
    dep: Dep,
    root_count: Cell<usize>,
}

impl Observer {
    fn attach_object(runtime: &Runtime, obj: &ObjectRef) -> Rc<Self> {
        let observer = Rc::new(Self {
            value: Observed::Object(obj.downgrade()),
            dep: Dep::new(),
            root_count: Cell::new(0),
        });
        obj.set_observer(observer.clone());
        debug!(dep = observer.dep.id().raw(), "observer attached to object");

        observer.walk(runtime, obj);
        observer
    }

    fn attach_array(runtime: &Runtime, arr: &ArrayRef) -> Rc<Self> {
        let observer = Rc::new(Self {
            value: Observed::Array(arr.downgrade()),
            dep: Dep::new(),
            root_count: Cell::new(0),
        });
        arr.set_observer(observer.clone());
        debug!(dep = observer.dep.id().raw(), len = arr.len(), "observer attached to array");

        observer.observe_array(runtime, &arr.to_vec());
        observer
    }

    /// Convert every own enumerable key of `obj` into a reactive property.
    fn walk(&self, runtime: &Runtime, obj: &ObjectRef) {
        for key in obj.keys() {
            runtime.install_reactive(obj, &key, ReactiveOptions::default());
        }
    }

    /// Observe each item.
    pub fn observe_array(&self, runtime: &Runtime, items: &[Value]) {
        for item in items {
            runtime.observe(item, false);
        }
    }

    /// The observed value, while it is alive.
    pub fn value(&self) -> Option<Value> {
        match &self.value {
            Observed::Object(weak) => weak.upgrade().map(Value::Object),
            Observed::Array(weak) => weak.upgrade().map(Value::Array),
        }
    }

    /// The collection Dep.
    pub fn dep(&self) -> &Dep {
        &self.dep
    }

    /// How many root state containers use this value as their root.
    pub fn root_count(&self) -> usize {
        self.root_count.get()
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("dep", &self.dep)
            .field("root_count", &self.root_count.get())
            .finish()
    }
}

impl Runtime {
    /// Return the Observer of `value`, creating one if needed.
    ///
    /// A new Observer is only created while observation is enabled, outside
    /// server rendering, for plain objects and arrays that are extensible.
    /// Primitives, framework instances and internal values are never
    /// observed. With `as_root`, the Observer's root count is incremented.
    pub fn observe(&self, value: &Value, as_root: bool) -> Option<Rc<Observer>> {
        let observer = match value {
            Value::Object(obj) => {
                if obj.kind() == ObjectKind::Internal {
                    return None;
                }
                match obj.observer() {
                    Some(existing) => Some(existing),
                    None if self.may_create_observer()
                        && obj.kind() == ObjectKind::Plain
                        && obj.is_extensible() =>
                    {
                        Some(Observer::attach_object(self, obj))
                    }
                    None => None,
                }
            }
            Value::Array(arr) => match arr.observer() {
                Some(existing) => Some(existing),
                None if self.may_create_observer() && arr.is_extensible() => {
                    Some(Observer::attach_array(self, arr))
                }
                None => None,
            },
            _ => return None,
        };

        if as_root {
            if let Some(observer) = &observer {
                observer.root_count.set(observer.root_count.get() + 1);
                debug!(
                    dep = observer.dep.id().raw(),
                    root_count = observer.root_count.get(),
                    "registered root state"
                );
            }
        }

        observer
    }

    /// Observe `value` and hand it back, for building reactive state inline.
    pub fn observable(&self, value: Value) -> Value {
        self.observe(&value, false);
        value
    }

    fn may_create_observer(&self) -> bool {
        self.should_observe() && !self.config().server_rendering
    }
}
