//! Object values.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::Value;
use crate::error::Result;
use crate::reactive::{Observer, ReactiveProperty};

/// Getter half of an accessor property.
pub type Getter = Rc<dyn Fn() -> Value>;

/// Setter half of an accessor property.
pub type Setter = Rc<dyn Fn(Value) -> Result<()>>;

/// What an object represents to the framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// A plain key/value object. Only these are observed.
    Plain,
    /// A framework root instance. Never observed, and never gains or loses
    /// reactive properties through `set`/`del`.
    Instance,
    /// A framework-internal artifact such as a render node. Never observed.
    Internal,
    /// A host object that is not a plain object (a date, a handle, ...).
    Opaque,
}

/// An accessor pair. Either half may be missing.
#[derive(Clone, Default)]
pub struct Accessor {
    pub get: Option<Getter>,
    pub set: Option<Setter>,
}

impl Accessor {
    pub fn new(
        get: impl Fn() -> Value + 'static,
        set: impl Fn(Value) -> Result<()> + 'static,
    ) -> Self {
        Self {
            get: Some(Rc::new(get)),
            set: Some(Rc::new(set)),
        }
    }

    pub fn read_only(get: impl Fn() -> Value + 'static) -> Self {
        Self {
            get: Some(Rc::new(get)),
            set: None,
        }
    }
}

/// Attribute flags of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyFlags {
    pub enumerable: bool,
    pub configurable: bool,
    pub writable: bool,
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self {
            enumerable: true,
            configurable: true,
            writable: true,
        }
    }
}

impl PropertyFlags {
    /// Enumerable, but neither configurable nor writable.
    pub fn frozen() -> Self {
        Self {
            enumerable: true,
            configurable: false,
            writable: false,
        }
    }

    pub fn hidden() -> Self {
        Self {
            enumerable: false,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub(crate) enum Slot {
    Data(Value),
    Accessor(Accessor),
    Reactive(Rc<ReactiveProperty>),
}

#[derive(Clone)]
pub(crate) struct Property {
    pub(crate) slot: Slot,
    pub(crate) flags: PropertyFlags,
}

pub(crate) struct ObjectData {
    kind: ObjectKind,
    props: IndexMap<String, Property>,
    proto: Option<ObjectRef>,
    extensible: bool,
    observer: Option<Rc<Observer>>,
}

/// Shared handle to an object. Clones refer to the same object.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<ObjectData>>);

/// Non-owning handle to an object.
#[derive(Clone)]
pub struct WeakObjectRef(Weak<RefCell<ObjectData>>);

impl WeakObjectRef {
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRef {
    /// Create an empty plain object.
    pub fn new() -> Self {
        Self::with_kind(ObjectKind::Plain)
    }

    pub fn with_kind(kind: ObjectKind) -> Self {
        Self(Rc::new(RefCell::new(ObjectData {
            kind,
            props: IndexMap::new(),
            proto: None,
            extensible: true,
            observer: None,
        })))
    }

    /// Create a plain object that inherits from `proto`.
    pub fn with_proto(proto: ObjectRef) -> Self {
        let obj = Self::new();
        obj.0.borrow_mut().proto = Some(proto);
        obj
    }

    /// Create a plain object from key/value pairs, in order.
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let obj = Self::new();
        for (key, value) in entries {
            obj.insert(key, value);
        }
        obj
    }

    pub fn kind(&self) -> ObjectKind {
        self.0.borrow().kind
    }

    pub fn proto(&self) -> Option<ObjectRef> {
        self.0.borrow().proto.clone()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Rc::downgrade(&self.0))
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Define a writable, enumerable data property, replacing whatever was
    /// there. This is a raw definition: no interceptor runs and nothing is
    /// notified.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.define(key, value, PropertyFlags::default());
    }

    /// Define a data property with explicit flags. Raw, like [`insert`](Self::insert).
    pub fn define(&self, key: impl Into<String>, value: Value, flags: PropertyFlags) {
        self.set_property(
            key.into(),
            Property {
                slot: Slot::Data(value),
                flags,
            },
        );
    }

    /// Define an accessor property. Raw, like [`insert`](Self::insert).
    pub fn define_accessor(
        &self,
        key: impl Into<String>,
        accessor: Accessor,
        flags: PropertyFlags,
    ) {
        self.set_property(
            key.into(),
            Property {
                slot: Slot::Accessor(accessor),
                flags,
            },
        );
    }

    /// Own enumerable keys, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0
            .borrow()
            .props
            .iter()
            .filter(|(_, prop)| prop.flags.enumerable)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.0.borrow().props.contains_key(key)
    }

    /// Own or inherited through the prototype chain.
    pub fn has_property(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Whether the own property `key` is backed by a reactive interceptor.
    pub fn is_reactive(&self, key: &str) -> bool {
        matches!(
            self.0.borrow().props.get(key).map(|prop| &prop.slot),
            Some(Slot::Reactive(_))
        )
    }

    /// Read a property without registering any dependency.
    ///
    /// Accessor getters still run. Missing keys read as `Undefined`.
    pub fn peek(&self, key: &str) -> Value {
        match self.lookup(key).map(|prop| prop.slot) {
            Some(Slot::Data(value)) => value,
            Some(Slot::Accessor(accessor)) => accessor.get.map(|get| get()).unwrap_or_default(),
            Some(Slot::Reactive(reactive)) => reactive.peek(),
            None => Value::Undefined,
        }
    }

    pub fn is_extensible(&self) -> bool {
        self.0.borrow().extensible
    }

    pub fn prevent_extensions(&self) {
        self.0.borrow_mut().extensible = false;
    }

    /// Make every own property non-configurable and every data property
    /// read-only, then prevent extensions.
    pub fn freeze(&self) {
        let mut data = self.0.borrow_mut();
        for prop in data.props.values_mut() {
            prop.flags.configurable = false;
            if matches!(prop.slot, Slot::Data(_)) {
                prop.flags.writable = false;
            }
        }
        data.extensible = false;
    }

    /// The Observer attached to this object, if any.
    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.0.borrow().observer.clone()
    }

    pub(crate) fn set_observer(&self, observer: Rc<Observer>) {
        self.0.borrow_mut().observer = Some(observer);
    }

    /// Own property, cloned out so no borrow is held while it is used.
    pub(crate) fn own_property(&self, key: &str) -> Option<Property> {
        self.0.borrow().props.get(key).cloned()
    }

    /// Own or inherited property.
    pub(crate) fn lookup(&self, key: &str) -> Option<Property> {
        let mut current = Some(self.clone());
        while let Some(obj) = current {
            if let Some(prop) = obj.own_property(key) {
                return Some(prop);
            }
            current = obj.proto();
        }
        None
    }

    pub(crate) fn set_property(&self, key: String, prop: Property) {
        self.0.borrow_mut().props.insert(key, prop);
    }

    pub(crate) fn write_data(&self, key: &str, value: Value) {
        if let Some(prop) = self.0.borrow_mut().props.get_mut(key) {
            prop.slot = Slot::Data(value);
        }
    }

    pub(crate) fn remove_property(&self, key: &str) -> Option<Property> {
        self.0.borrow_mut().props.shift_remove(key)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("Object")
            .field("kind", &data.kind)
            .field("keys", &data.props.keys().collect::<Vec<_>>())
            .field("observed", &data.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_kept() {
        let obj = ObjectRef::from_entries([("b", Value::from(1)), ("a", Value::from(2))]);
        assert_eq!(obj.keys(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn hidden_properties_are_not_listed() {
        let obj = ObjectRef::new();
        obj.define("secret", Value::from(1), PropertyFlags::hidden());
        assert!(obj.keys().is_empty());
        assert!(obj.has_own("secret"));
    }

    #[test]
    fn lookup_follows_the_prototype_chain() {
        let base = ObjectRef::from_entries([("inherited", Value::from(1))]);
        let child = ObjectRef::with_proto(base);
        assert!(!child.has_own("inherited"));
        assert!(child.has_property("inherited"));
        assert_eq!(child.peek("inherited").as_number(), Some(1.0));
        assert!(child.peek("missing").is_undefined());
    }

    #[test]
    fn freeze_locks_properties() {
        let obj = ObjectRef::from_entries([("a", Value::from(1))]);
        obj.freeze();
        let prop = obj.own_property("a").unwrap();
        assert!(!prop.flags.configurable);
        assert!(!prop.flags.writable);
        assert!(!obj.is_extensible());
    }

    #[test]
    fn accessor_getter_runs_on_peek() {
        let obj = ObjectRef::new();
        obj.define_accessor(
            "answer",
            Accessor::read_only(|| Value::from(42)),
            PropertyFlags::default(),
        );
        assert_eq!(obj.peek("answer").as_number(), Some(42.0));
    }
}
