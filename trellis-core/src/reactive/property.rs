//! Reactive Properties
//!
//! `define_reactive` replaces one object property with an interceptor: a
//! reactive slot that owns a Dep, tracks reads and notifies on writes.
//!
//! # Reads
//!
//! While a subscriber is active, reading the slot registers:
//!
//! 1. the slot's own Dep,
//! 2. the collection Dep of the held value's Observer, if any, so that
//!    structural changes of the value reach the reader,
//! 3. for arrays, the collection Deps of every observed element,
//!    recursively, since element access is not intercepted.
//!
//! # Writes
//!
//! Writing a value identical to the current one (including `NaN` over
//! `NaN`) is a no-op. Otherwise the value is stored (or handed to the
//! delegate setter), re-observed, and the slot's Dep is notified.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use super::dep::Dep;
use super::observer::Observer;
use super::runtime::Runtime;
use crate::error::{ReactiveError, Result};
use crate::value::{ArrayRef, Getter, ObjectRef, Property, PropertyFlags, Setter, Slot, Value};

/// Options for [`Runtime::define_reactive`].
#[derive(Clone, Default)]
pub struct ReactiveOptions {
    /// Initial value. When absent, the property's current value is read.
    pub value: Option<Value>,

    /// Diagnostic hook run before every effective write, outside
    /// production mode.
    pub on_change: Option<Rc<dyn Fn()>>,

    /// Do not observe the held value.
    pub shallow: bool,
}

impl ReactiveOptions {
    pub fn with_value(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn shallow(mut self) -> Self {
        self.shallow = true;
        self
    }

    pub fn on_change(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_change = Some(Rc::new(hook));
        self
    }
}

/// The interceptor installed on a reactive property.
pub struct ReactiveProperty {
    dep: Dep,
    value: RefCell<Value>,
    getter: Option<Getter>,
    setter: Option<Setter>,
    delegate: Option<Rc<ReactiveProperty>>,
    child: RefCell<Option<Rc<Observer>>>,
    shallow: bool,
    on_change: Option<Rc<dyn Fn()>>,
}

impl ReactiveProperty {
    /// The property's own Dep.
    pub fn dep(&self) -> &Dep {
        &self.dep
    }

    /// Observer of the currently held value.
    pub fn child_observer(&self) -> Option<Rc<Observer>> {
        self.child.borrow().clone()
    }

    /// Current value, without tracking.
    pub(crate) fn peek(&self) -> Value {
        if let Some(previous) = &self.delegate {
            return previous.peek();
        }
        match &self.getter {
            Some(get) => get(),
            None => self.value.borrow().clone(),
        }
    }

    /// Tracked read.
    pub fn get(&self, runtime: &Runtime) -> Value {
        let value = match &self.delegate {
            Some(previous) => previous.get(runtime),
            None => self.peek(),
        };
        if runtime.is_tracking() {
            self.dep.depend(runtime);
            if let Some(child) = self.child_observer() {
                child.dep().depend(runtime);
                if let Value::Array(arr) = &value {
                    depend_array(runtime, arr);
                }
            }
        }
        value
    }

    /// Intercepted write.
    pub fn set(&self, runtime: &Runtime, new_value: Value) -> Result<()> {
        let old = self.peek();
        if new_value.strict_eq(&old) || (new_value.is_self_unequal() && old.is_self_unequal()) {
            return Ok(());
        }

        if runtime.diagnostics_enabled() {
            if let Some(hook) = &self.on_change {
                hook();
            }
        }

        // Accessor without a setter: read-only.
        if self.getter.is_some() && self.setter.is_none() {
            return Ok(());
        }
        match (&self.delegate, &self.setter) {
            (Some(previous), _) => previous.set(runtime, new_value.clone())?,
            (None, Some(set)) => set(new_value.clone())?,
            (None, None) => *self.value.borrow_mut() = new_value.clone(),
        }

        let child = if self.shallow {
            None
        } else {
            runtime.observe(&new_value, false)
        };
        *self.child.borrow_mut() = child;

        self.dep.notify(runtime)
    }
}

impl fmt::Debug for ReactiveProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveProperty")
            .field("dep", &self.dep)
            .field("accessor", &self.getter.is_some())
            .field("delegated", &self.delegate.is_some())
            .field("shallow", &self.shallow)
            .finish()
    }
}

/// Register the collection Dep of every observed element of `arr`,
/// descending into nested arrays. Each array is visited once.
pub(crate) fn depend_array(runtime: &Runtime, arr: &ArrayRef) {
    let mut seen = HashSet::new();
    depend_array_inner(runtime, arr, &mut seen);
}

fn depend_array_inner(runtime: &Runtime, arr: &ArrayRef, seen: &mut HashSet<usize>) {
    if !seen.insert(arr.addr()) {
        return;
    }
    for item in arr.to_vec() {
        if let Some(observer) = item.observer() {
            observer.dep().depend(runtime);
        }
        if let Value::Array(inner) = &item {
            depend_array_inner(runtime, inner, seen);
        }
    }
}

impl Runtime {
    /// Turn `obj[key]` into a reactive property.
    ///
    /// A non-configurable property is left untouched. An existing accessor
    /// (or an existing reactive slot) becomes the delegate of the new one.
    /// Fails only when `key` is new and `obj` is not extensible.
    pub fn define_reactive(
        &self,
        obj: &ObjectRef,
        key: &str,
        options: ReactiveOptions,
    ) -> Result<()> {
        if !obj.has_own(key) && !obj.is_extensible() {
            return Err(ReactiveError::NotExtensible(key.to_string()));
        }
        self.install_reactive(obj, key, options);
        Ok(())
    }

    pub(crate) fn install_reactive(
        &self,
        obj: &ObjectRef,
        key: &str,
        options: ReactiveOptions,
    ) -> Option<Rc<ReactiveProperty>> {
        let existing = obj.own_property(key);
        if existing.as_ref().is_some_and(|prop| !prop.flags.configurable) {
            return None;
        }

        let (getter, setter, delegate) = match existing.map(|prop| prop.slot) {
            Some(Slot::Accessor(accessor)) => (accessor.get, accessor.set, None),
            Some(Slot::Reactive(previous)) => (None, None, Some(previous)),
            _ => (None, None, None),
        };

        let value = match (options.value, &delegate) {
            (Some(value), _) => value,
            (None, Some(previous)) => previous.peek(),
            (None, None) if getter.is_none() || setter.is_some() => obj.peek(key),
            (None, None) => Value::Undefined,
        };
        let child = if options.shallow {
            None
        } else {
            self.observe(&value, false)
        };

        let property = Rc::new(ReactiveProperty {
            dep: Dep::new(),
            value: RefCell::new(value),
            getter,
            setter,
            delegate,
            child: RefCell::new(child),
            shallow: options.shallow,
            on_change: options.on_change,
        });
        obj.set_property(
            key.to_string(),
            Property {
                slot: Slot::Reactive(property.clone()),
                flags: PropertyFlags::default(),
            },
        );
        Some(property)
    }
}

impl ObjectRef {
    /// Tracked read of `key`, through the prototype chain.
    pub fn get(&self, runtime: &Runtime, key: &str) -> Value {
        match self.lookup(key).map(|prop| prop.slot) {
            Some(Slot::Data(value)) => value,
            Some(Slot::Accessor(accessor)) => accessor.get.map(|get| get()).unwrap_or_default(),
            Some(Slot::Reactive(property)) => property.get(runtime),
            None => Value::Undefined,
        }
    }

    /// Assign `obj[key] = value`.
    ///
    /// Reactive and accessor setters run (inherited ones included). A key
    /// that is not found anywhere becomes a plain data property, which is
    /// not reactive: use [`Runtime::set`] to add a tracked one.
    pub fn put(&self, runtime: &Runtime, key: &str, value: Value) -> Result<()> {
        if let Some(prop) = self.own_property(key) {
            return match prop.slot {
                Slot::Reactive(property) => property.set(runtime, value),
                Slot::Accessor(accessor) => match accessor.set {
                    Some(set) => set(value),
                    None => Err(ReactiveError::ReadOnly(key.to_string())),
                },
                Slot::Data(_) if prop.flags.writable => {
                    self.write_data(key, value);
                    Ok(())
                }
                Slot::Data(_) => Err(ReactiveError::ReadOnly(key.to_string())),
            };
        }

        if let Some(inherited) = self.proto().and_then(|proto| proto.lookup(key)) {
            match inherited.slot {
                Slot::Reactive(property) => return property.set(runtime, value),
                Slot::Accessor(accessor) => {
                    return match accessor.set {
                        Some(set) => set(value),
                        None => Err(ReactiveError::ReadOnly(key.to_string())),
                    };
                }
                Slot::Data(_) if !inherited.flags.writable => {
                    return Err(ReactiveError::ReadOnly(key.to_string()));
                }
                Slot::Data(_) => {}
            }
        }

        if !self.is_extensible() {
            return Err(ReactiveError::NotExtensible(key.to_string()));
        }
        self.insert(key, value);
        Ok(())
    }
}
