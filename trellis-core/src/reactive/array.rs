//! Reactive Array Mutation
//!
//! Array indices are never intercepted. Instead, the operations that mutate
//! an array in place are the only ones that notify: on an observed array each
//! of them performs the mutation, observes the elements it inserted, and
//! notifies the array's collection Dep. On an unobserved array they are plain
//! mutations.
//!
//! The collection Dep is notified on every call, even when the call turned
//! out to change nothing (popping an empty array, for instance).

use std::cmp::Ordering;

use super::runtime::Runtime;
use crate::error::{ReactiveError, Result};
use crate::value::{ArrayRef, Value};

impl ArrayRef {
    /// Append `items`, returning the new length.
    pub fn push(&self, runtime: &Runtime, items: impl IntoIterator<Item = Value>) -> Result<usize> {
        let inserted: Vec<Value> = items.into_iter().collect();
        self.ensure_can_grow(inserted.len())?;
        let len = self.with_items_mut(|vec| {
            vec.extend(inserted.iter().cloned());
            vec.len()
        });
        self.mutated(runtime, &inserted)?;
        Ok(len)
    }

    /// Remove and return the last element (`Undefined` if empty).
    pub fn pop(&self, runtime: &Runtime) -> Result<Value> {
        let removed = self.with_items_mut(|vec| vec.pop()).unwrap_or_default();
        self.mutated(runtime, &[])?;
        Ok(removed)
    }

    /// Remove and return the first element (`Undefined` if empty).
    pub fn shift(&self, runtime: &Runtime) -> Result<Value> {
        let removed = self.with_items_mut(|vec| (!vec.is_empty()).then(|| vec.remove(0)));
        self.mutated(runtime, &[])?;
        Ok(removed.unwrap_or_default())
    }

    /// Prepend `items`, returning the new length.
    pub fn unshift(
        &self,
        runtime: &Runtime,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<usize> {
        let inserted: Vec<Value> = items.into_iter().collect();
        self.ensure_can_grow(inserted.len())?;
        let len = self.with_items_mut(|vec| {
            vec.splice(0..0, inserted.iter().cloned());
            vec.len()
        });
        self.mutated(runtime, &inserted)?;
        Ok(len)
    }

    /// Remove `delete_count` elements starting at `start` and insert `items`
    /// in their place. Both bounds are clamped to the array. Returns the
    /// removed elements.
    pub fn splice(
        &self,
        runtime: &Runtime,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<Vec<Value>> {
        let inserted: Vec<Value> = items.into_iter().collect();
        let len = self.len();
        let start = start.min(len);
        let end = start + delete_count.min(len - start);
        self.ensure_can_grow(inserted.len().saturating_sub(end - start))?;

        let removed: Vec<Value> = self.with_items_mut(|vec| {
            vec.splice(start..end, inserted.iter().cloned()).collect()
        });
        self.mutated(runtime, &inserted)?;
        Ok(removed)
    }

    /// Sort in place by string value, with `Undefined` last.
    pub fn sort(&self, runtime: &Runtime) -> Result<()> {
        self.sort_by(runtime, default_order)
    }

    /// Sort in place with a comparator, stably, with `Undefined` last.
    ///
    /// The comparator runs on a copy of the elements, so it may read this
    /// array. It does not have to be a total order: an inconsistent
    /// comparator yields an unspecified permutation, never a panic.
    pub fn sort_by(
        &self,
        runtime: &Runtime,
        mut compare: impl FnMut(&Value, &Value) -> Ordering,
    ) -> Result<()> {
        let (defined, undefined): (Vec<Value>, Vec<Value>) =
            self.to_vec().into_iter().partition(|item| !item.is_undefined());
        let mut items = merge_sort_by(defined, &mut compare);
        items.extend(undefined);
        self.with_items_mut(|vec| *vec = items);
        self.mutated(runtime, &[])
    }

    pub fn reverse(&self, runtime: &Runtime) -> Result<()> {
        self.with_items_mut(|vec| vec.reverse());
        self.mutated(runtime, &[])
    }

    pub(crate) fn ensure_can_grow(&self, added: usize) -> Result<()> {
        if added > 0 && !self.is_extensible() {
            return Err(ReactiveError::NotExtensible(self.len().to_string()));
        }
        Ok(())
    }

    fn mutated(&self, runtime: &Runtime, inserted: &[Value]) -> Result<()> {
        if let Some(observer) = self.observer() {
            if !inserted.is_empty() {
                observer.observe_array(runtime, inserted);
            }
            observer.dep().notify(runtime)?;
        }
        Ok(())
    }
}

fn default_order(a: &Value, b: &Value) -> Ordering {
    a.to_display_string().cmp(&b.to_display_string())
}

/// Top-down merge sort. Only ever asks whether the right element sorts
/// strictly before the left one, so any comparator result is acceptable.
fn merge_sort_by<F>(mut items: Vec<Value>, compare: &mut F) -> Vec<Value>
where
    F: FnMut(&Value, &Value) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort_by(items, compare);
    let right = merge_sort_by(right, compare);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        if compare(b, a) == Ordering::Less {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    merged
}
