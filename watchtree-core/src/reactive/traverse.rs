//! Deep traversal.
//!
//! Reads every reachable slot of a value so that the active reader
//! depends on all of them. Used by deep watchers.

use std::collections::HashSet;

use crate::observer::is_excluded;
use crate::value::Value;

/// Touch every nested slot of `value`.
pub(crate) fn traverse(value: &Value) {
    let mut seen = HashSet::new();
    traverse_inner(value, &mut seen);
}

fn traverse_inner(value: &Value, seen: &mut HashSet<usize>) {
    let Some(addr) = value.container_addr() else {
        return;
    };
    if is_excluded(value) || !seen.insert(addr) {
        return;
    }

    match value {
        Value::Array(array) => {
            if !array.is_extensible() {
                return;
            }
            for item in array.to_vec() {
                traverse_inner(&item, seen);
            }
        }
        Value::Object(object) => {
            if !object.is_extensible() {
                return;
            }
            for key in object.keys() {
                traverse_inner(&object.get(&key), seen);
            }
        }
        _ => {}
    }
}
