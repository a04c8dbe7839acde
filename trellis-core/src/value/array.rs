//! Array values.
//!
//! Raw element access lives here. The mutating methods that notify
//! observers (`push`, `splice`, ...) are in `reactive::array`.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::Value;
use crate::reactive::Observer;

pub(crate) struct ArrayData {
    items: Vec<Value>,
    extensible: bool,
    observer: Option<Rc<Observer>>,
}

/// Shared handle to an array. Clones refer to the same array.
#[derive(Clone)]
pub struct ArrayRef(Rc<RefCell<ArrayData>>);

/// Non-owning handle to an array.
#[derive(Clone)]
pub struct WeakArrayRef(Weak<RefCell<ArrayData>>);

impl WeakArrayRef {
    pub fn upgrade(&self) -> Option<ArrayRef> {
        self.0.upgrade().map(ArrayRef)
    }
}

impl Default for ArrayRef {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayRef {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(ArrayData {
            items,
            extensible: true,
            observer: None,
        })))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, or `Undefined` past the end. Never tracked.
    pub fn get(&self, index: usize) -> Value {
        self.0.borrow().items.get(index).cloned().unwrap_or_default()
    }

    /// Copy of the elements. Never tracked.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().items.clone()
    }

    /// Overwrite one element in place, growing the array with `Undefined`
    /// if needed. Index writes are not intercepted: nobody is notified and
    /// the element is not observed. Use `Runtime::set` for a reactive write.
    pub fn write_index(&self, index: usize, value: Value) {
        let mut data = self.0.borrow_mut();
        if index >= data.items.len() {
            data.items.resize(index + 1, Value::Undefined);
        }
        data.items[index] = value;
    }

    /// Truncate, or extend with `Undefined`. Not intercepted.
    pub fn set_len(&self, len: usize) {
        self.0.borrow_mut().items.resize(len, Value::Undefined);
    }

    pub fn is_extensible(&self) -> bool {
        self.0.borrow().extensible
    }

    pub fn prevent_extensions(&self) {
        self.0.borrow_mut().extensible = false;
    }

    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.0.borrow().observer.clone()
    }

    pub(crate) fn set_observer(&self, observer: Rc<Observer>) {
        self.0.borrow_mut().observer = Some(observer);
    }

    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakArrayRef {
        WeakArrayRef(Rc::downgrade(&self.0))
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Run `f` against the element vector. `f` must not call back into
    /// this array.
    pub(crate) fn with_items_mut<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        f(&mut self.0.borrow_mut().items)
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("Array")
            .field("len", &data.items.len())
            .field("observed", &data.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_reads_are_undefined() {
        let arr = ArrayRef::from_vec(vec![Value::from(1)]);
        assert!(arr.get(5).is_undefined());
    }

    #[test]
    fn write_index_grows_the_array() {
        let arr = ArrayRef::new();
        arr.write_index(2, Value::from("x"));
        assert_eq!(arr.len(), 3);
        assert!(arr.get(0).is_undefined());
        assert_eq!(arr.get(2).as_str(), Some("x"));
    }

    #[test]
    fn set_len_truncates_and_extends() {
        let arr = ArrayRef::from_vec(vec![Value::from(1), Value::from(2), Value::from(3)]);
        arr.set_len(1);
        assert_eq!(arr.len(), 1);
        arr.set_len(4);
        assert_eq!(arr.len(), 4);
        assert!(arr.get(3).is_undefined());
    }
}
