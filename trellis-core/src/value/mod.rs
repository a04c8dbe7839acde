//! Dynamic Values
//!
//! The reactivity core converts plain object and array graphs into observable
//! state. This module defines that graph: a small dynamic value model with
//! shared, identity-bearing containers.
//!
//! # Containers
//!
//! - [`ObjectRef`]: an insertion-ordered property map with an optional
//!   prototype. Properties are data slots, accessor pairs, or reactive slots
//!   installed by [`define_reactive`](crate::reactive::Runtime::define_reactive).
//! - [`ArrayRef`]: a growable list. Element reads and index writes are never
//!   intercepted; structural changes go through the mutation methods in
//!   [`reactive::array`](crate::reactive).
//!
//! Both carry a hidden Observer slot that marks them as already converted.
//! The slot is not a property and never shows up in [`ObjectRef::keys`].
//!
//! # Equality
//!
//! [`Value::strict_eq`] compares primitives by value and containers by
//! identity. Numbers follow IEEE semantics, so `NaN` is not equal to itself.

mod array;
mod object;

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::error::{ReactiveError, Result};
use crate::reactive::Observer;

pub use array::{ArrayRef, WeakArrayRef};
pub use object::{Accessor, Getter, ObjectKind, ObjectRef, PropertyFlags, Setter, WeakObjectRef};
pub(crate) use object::{Property, Slot};

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(ObjectRef),
    Array(ArrayRef),
}

impl Value {
    /// Name of the value's type, as used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Objects and arrays. Everything else is a primitive.
    pub fn is_object_like(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Strict equality: primitives by value, containers by identity.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// True only for `NaN`, the one value that is not strictly equal to itself.
    pub fn is_self_unequal(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }

    /// The Observer attached to this value, if it has been made reactive.
    pub fn observer(&self) -> Option<Rc<Observer>> {
        match self {
            Value::Object(obj) => obj.observer(),
            Value::Array(arr) => arr.observer(),
            _ => None,
        }
    }

    /// String conversion used by the default array sort order.
    pub fn to_display_string(&self) -> Cow<'_, str> {
        match self {
            Value::Undefined => Cow::Borrowed("undefined"),
            Value::Null => Cow::Borrowed("null"),
            Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Value::Number(n) => Cow::Owned(format_number(*n)),
            Value::String(s) => Cow::Borrowed(s),
            Value::Object(_) => Cow::Borrowed("[object Object]"),
            Value::Array(arr) => Cow::Owned(
                arr.to_vec()
                    .iter()
                    .map(|item| match item {
                        Value::Undefined | Value::Null => String::new(),
                        other => other.to_display_string().into_owned(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }

    /// Build a fresh, unobserved value graph from JSON.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s.as_str()),
            serde_json::Value::Array(items) => {
                Value::Array(ArrayRef::from_vec(items.iter().map(Value::from_json).collect()))
            }
            serde_json::Value::Object(map) => {
                let obj = ObjectRef::new();
                for (key, value) in map {
                    obj.insert(key.as_str(), Value::from_json(value));
                }
                Value::Object(obj)
            }
        }
    }

    /// Snapshot this value as JSON without registering any dependency.
    ///
    /// `undefined` object members are omitted and `undefined` array elements
    /// become `null`, as do non-finite numbers.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut path = HashSet::new();
        self.to_json_inner(&mut path)
    }

    fn to_json_inner(&self, path: &mut HashSet<usize>) -> Result<serde_json::Value> {
        Ok(match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => json_number(*n),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(arr) => {
                if !path.insert(arr.addr()) {
                    return Err(ReactiveError::Cyclic);
                }
                let items = arr
                    .to_vec()
                    .iter()
                    .map(|item| item.to_json_inner(path))
                    .collect::<Result<Vec<_>>>()?;
                path.remove(&arr.addr());
                serde_json::Value::Array(items)
            }
            Value::Object(obj) => {
                if !path.insert(obj.addr()) {
                    return Err(ReactiveError::Cyclic);
                }
                let mut map = serde_json::Map::new();
                for key in obj.keys() {
                    let value = obj.peek(&key);
                    if !value.is_undefined() {
                        map.insert(key, value.to_json_inner(path)?);
                    }
                }
                path.remove(&obj.addr());
                serde_json::Value::Object(map)
            }
        })
    }
}

/// Largest magnitude below which every integer is exactly representable.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Integral numbers serialize as JSON integers, non-finite ones as `null`.
fn json_number(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::Number(serde_json::Number::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Object(obj) => fmt::Debug::fmt(obj, f),
            Value::Array(arr) => fmt::Debug::fmt(arr, f),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<ArrayRef> for Value {
    fn from(arr: ArrayRef) -> Self {
        Value::Array(arr)
    }
}

/// A property key: either an array index or a named property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Index(usize),
    Name(String),
}

impl PropertyKey {
    /// The key as an array index, if it is one. Named keys that spell a
    /// non-negative integer count as indices.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            PropertyKey::Name(name) => name.parse::<usize>().ok(),
        }
    }

    /// The key as a property name.
    pub fn to_name(&self) -> Cow<'_, str> {
        match self {
            PropertyKey::Index(i) => Cow::Owned(i.to_string()),
            PropertyKey::Name(name) => Cow::Borrowed(name),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_name())
    }
}

impl From<usize> for PropertyKey {
    fn from(i: usize) -> Self {
        PropertyKey::Index(i)
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        PropertyKey::Name(name.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(name: String) -> Self {
        PropertyKey::Name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_self_unequal() {
        let nan = Value::Number(f64::NAN);
        assert!(!nan.strict_eq(&nan));
        assert!(nan.is_self_unequal());
        assert!(!Value::Number(1.0).is_self_unequal());
    }

    #[test]
    fn containers_compare_by_identity() {
        let a = ObjectRef::new();
        let b = ObjectRef::new();
        assert!(Value::from(a.clone()).strict_eq(&Value::from(a)));
        assert!(!Value::from(b).strict_eq(&Value::from(ObjectRef::new())));
    }

    #[test]
    fn named_keys_parse_as_indices() {
        assert_eq!(PropertyKey::from("3").as_index(), Some(3));
        assert_eq!(PropertyKey::from("x").as_index(), None);
        assert_eq!(PropertyKey::from("-1").as_index(), None);
        assert_eq!(PropertyKey::from(7usize).to_name(), "7");
    }

    #[test]
    fn json_conversion_preserves_shape() {
        let json = serde_json::json!({ "a": 1, "list": [true, "x", null] });
        let value = Value::from_json(&json);
        assert_eq!(value.to_json().unwrap(), json);
    }

    #[test]
    fn integral_numbers_serialize_as_integers() {
        assert_eq!(Value::from(3).to_json().unwrap(), serde_json::json!(3));
        assert_eq!(Value::from(-0.0).to_json().unwrap(), serde_json::json!(0));
        assert_eq!(Value::from(2.5).to_json().unwrap(), serde_json::json!(2.5));
        assert_eq!(Value::from(1e300).to_json().unwrap(), serde_json::json!(1e300));
        assert!(Value::Number(f64::INFINITY).to_json().unwrap().is_null());
        assert!(Value::Number(f64::NAN).to_json().unwrap().is_null());
    }

    #[test]
    fn cyclic_graph_fails_to_serialize() {
        let obj = ObjectRef::new();
        obj.insert("me", Value::from(obj.clone()));
        let err = Value::from(obj).to_json().unwrap_err();
        assert!(matches!(err, ReactiveError::Cyclic));
    }

    #[test]
    fn display_string_matches_sort_order_keys() {
        assert_eq!(Value::from(10).to_display_string(), "10");
        assert_eq!(Value::from(1.5).to_display_string(), "1.5");
        assert_eq!(Value::Number(f64::NAN).to_display_string(), "NaN");
        let arr = ArrayRef::from_vec(vec![Value::from(1), Value::Null, Value::from("a")]);
        assert_eq!(Value::from(arr).to_display_string(), "1,,a");
    }
}
