//! Dynamic Membership
//!
//! Interceptors only exist for keys that were present when a value was
//! observed. `set` and `del` are how keys are added to or removed from
//! already-observed state while keeping it reactive:
//!
//! - a new key on an observed object gets an interceptor, and the object's
//!   collection Dep is notified so shape-dependent readers re-run;
//! - array indices go through `splice`, which already notifies;
//! - root state containers keep the shape they were initialized with.

use std::iter;

use tracing::warn;

use super::property::ReactiveOptions;
use super::runtime::Runtime;
use crate::error::{ReactiveError, Result};
use crate::value::{ArrayRef, ObjectKind, ObjectRef, PropertyKey, Value};

/// Largest array length. Valid indices are below it.
const MAX_ARRAY_LENGTH: usize = u32::MAX as usize;

impl Runtime {
    /// Set `target[key] = value`, adding a reactive property if `key` is new.
    ///
    /// Returns the value. Additions to a framework instance or to a root
    /// state container are refused with a warning and leave the target
    /// unchanged.
    pub fn set(&self, target: &Value, key: impl Into<PropertyKey>, value: Value) -> Result<Value> {
        let key = key.into();
        match target {
            Value::Array(arr) => self.set_on_array(arr, &key, value),
            Value::Object(obj) => self.set_on_object(obj, &key.to_name(), value),
            other => Err(self.invalid_target("set", other)),
        }
    }

    /// Delete `target[key]`, notifying readers of the container's shape.
    ///
    /// Missing keys are a no-op. Deleting from a framework instance or a
    /// root state container is refused with a warning.
    pub fn del(&self, target: &Value, key: impl Into<PropertyKey>) -> Result<()> {
        let key = key.into();
        match target {
            Value::Array(arr) => self.del_on_array(arr, &key),
            Value::Object(obj) => self.del_on_object(obj, &key.to_name()),
            other => Err(self.invalid_target("delete", other)),
        }
    }

    fn set_on_array(&self, arr: &ArrayRef, key: &PropertyKey, value: Value) -> Result<Value> {
        if let Some(index) = key.as_index() {
            if index >= MAX_ARRAY_LENGTH {
                return Err(ReactiveError::InvalidArrayKey(key.to_string()));
            }
            let len = arr.len();
            if index >= len {
                arr.ensure_can_grow(index + 1 - len)?;
                arr.set_len(index);
            }
            arr.splice(self, index, 1, iter::once(value.clone()))?;
            return Ok(value);
        }

        if key.to_name() == "length" {
            return match value.as_number() {
                Some(len)
                    if len >= 0.0 && len.fract() == 0.0 && len <= MAX_ARRAY_LENGTH as f64 =>
                {
                    let len = len as usize;
                    arr.ensure_can_grow(len.saturating_sub(arr.len()))?;
                    arr.set_len(len);
                    Ok(value)
                }
                _ => Err(ReactiveError::InvalidArrayKey(format!("length = {value:?}"))),
            };
        }

        Err(ReactiveError::InvalidArrayKey(key.to_string()))
    }

    fn set_on_object(&self, obj: &ObjectRef, key: &str, value: Value) -> Result<Value> {
        if obj.has_property(key) {
            obj.put(self, key, value.clone())?;
            return Ok(value);
        }

        let observer = obj.observer();
        if obj.kind() == ObjectKind::Instance
            || observer.as_ref().is_some_and(|ob| ob.root_count() > 0)
        {
            if self.diagnostics_enabled() {
                warn!(
                    key,
                    "Avoid adding reactive properties to a framework instance or its root state \
                     at runtime - declare it upfront instead"
                );
            }
            return Ok(value);
        }

        let Some(observer) = observer else {
            obj.put(self, key, value.clone())?;
            return Ok(value);
        };

        self.define_reactive(obj, key, ReactiveOptions::with_value(value.clone()))?;
        observer.dep().notify(self)?;
        Ok(value)
    }

    fn del_on_array(&self, arr: &ArrayRef, key: &PropertyKey) -> Result<()> {
        if let Some(index) = key.as_index() {
            if index >= MAX_ARRAY_LENGTH {
                return Err(ReactiveError::InvalidArrayKey(key.to_string()));
            }
            arr.splice(self, index, 1, iter::empty())?;
            return Ok(());
        }
        if key.to_name() == "length" {
            return Err(ReactiveError::NonConfigurable("length".to_string()));
        }
        Ok(())
    }

    fn del_on_object(&self, obj: &ObjectRef, key: &str) -> Result<()> {
        let observer = obj.observer();
        if obj.kind() == ObjectKind::Instance
            || observer.as_ref().is_some_and(|ob| ob.root_count() > 0)
        {
            if self.diagnostics_enabled() {
                warn!(
                    key,
                    "Avoid deleting properties on a framework instance or its root state - \
                     just set it to null"
                );
            }
            return Ok(());
        }

        let Some(prop) = obj.own_property(key) else {
            return Ok(());
        };
        if !prop.flags.configurable {
            return Err(ReactiveError::NonConfigurable(key.to_string()));
        }
        obj.remove_property(key);

        if let Some(observer) = observer {
            observer.dep().notify(self)?;
        }
        Ok(())
    }

    fn invalid_target(&self, op: &'static str, target: &Value) -> ReactiveError {
        if self.diagnostics_enabled() {
            warn!(
                op,
                target = target.type_name(),
                "Cannot {} reactive property on undefined, null, or primitive value",
                op
            );
        }
        ReactiveError::InvalidTarget {
            op,
            kind: target.type_name(),
        }
    }
}
