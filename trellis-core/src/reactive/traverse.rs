//! Deep traversal for deep watchers.

use std::collections::HashSet;

use super::runtime::Runtime;
use crate::value::{ObjectKind, Value};

/// Read every reactive property and array element reachable from `value`,
/// so the active target depends on all of them.
///
/// Each container is visited once, which also cuts cycles. Non-extensible
/// values and framework-internal objects are skipped.
pub fn traverse(runtime: &Runtime, value: &Value) {
    let mut seen = HashSet::new();
    visit(runtime, value, &mut seen);
}

fn visit(runtime: &Runtime, value: &Value, seen: &mut HashSet<usize>) {
    match value {
        Value::Array(arr) => {
            if !arr.is_extensible() || !seen.insert(arr.addr()) {
                return;
            }
            for item in arr.to_vec() {
                visit(runtime, &item, seen);
            }
        }
        Value::Object(obj) => {
            if !obj.is_extensible()
                || obj.kind() == ObjectKind::Internal
                || !seen.insert(obj.addr())
            {
                return;
            }
            for key in obj.keys() {
                let item = obj.get(runtime, &key);
                visit(runtime, &item, seen);
            }
        }
        _ => {}
    }
}
