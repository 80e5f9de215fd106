//! Dynamic mutation API.
//!
//! Reactive slots only exist for keys present when an object was observed.
//! [`set`] adds a key after the fact and [`del`] removes one, in both cases
//! notifying consumers that depend on the container's shape. On arrays both
//! route through `splice`, which notifies on its own.
//!
//! Misuse (primitive targets, root data) produces a diagnostic and never
//! fails the caller.

use std::sync::Arc;

use super::accessor::{define_reactive, DefineOptions};
use super::{Observer, ReactiveObject};
use crate::diagnostics::{self, Diagnostic};
use crate::value::{PropKey, Value};

/// Set `key` on `target`, adding a reactive slot if the key is new.
///
/// Returns `value`.
pub fn set(target: &Value, key: impl Into<PropKey>, value: Value) -> Value {
    let key = key.into();
    match target {
        Value::Array(array) => match key.as_index() {
            Some(index) => {
                if array.set_length(array.len().max(index)) {
                    array.splice(splice_start(index), Some(1), vec![value.clone()]);
                } else {
                    diagnostics::warn(Diagnostic::ArrayTooLarge {
                        key: key.to_string(),
                    });
                }
            }
            None => diagnostics::warn(Diagnostic::InvalidArrayIndex {
                key: key.to_string(),
            }),
        },
        Value::Object(object) => set_on_object(object, &key.to_name(), value.clone()),
        other => diagnostics::warn(Diagnostic::SetOnPrimitive {
            key: key.to_string(),
            found: other.type_name(),
        }),
    }
    value
}

fn set_on_object(object: &ReactiveObject, key: &str, value: Value) {
    if object.has_own(key) {
        object.assign(key, value);
        return;
    }

    let observer = match ensure_not_root(object, || Diagnostic::AddToRoot { key: key.into() }) {
        Ok(observer) => observer,
        Err(diagnostic) => return diagnostics::warn(diagnostic),
    };

    let Some(observer) = observer else {
        object.assign(key, value);
        return;
    };

    if define_reactive(object, key, DefineOptions::with_value(value)) {
        observer.dep().notify();
    }
}

/// Delete `key` from `target`, notifying shape consumers if it existed.
pub fn del(target: &Value, key: impl Into<PropKey>) {
    let key = key.into();
    match target {
        Value::Array(array) => {
            // Arrays carry no named keys, and indices past the end are absent.
            if let Some(index) = key.as_index().filter(|&index| index < array.len()) {
                array.splice(splice_start(index), Some(1), Vec::new());
            }
        }
        Value::Object(object) => del_on_object(object, &key.to_name()),
        other => diagnostics::warn(Diagnostic::DeleteOnPrimitive {
            key: key.to_string(),
            found: other.type_name(),
        }),
    }
}

fn del_on_object(object: &ReactiveObject, key: &str) {
    let observer = match ensure_not_root(object, || Diagnostic::DeleteFromRoot { key: key.into() })
    {
        Ok(observer) => observer,
        Err(diagnostic) => return diagnostics::warn(diagnostic),
    };

    if !object.has_own(key) || !object.remove(key) {
        return;
    }
    if let Some(observer) = observer {
        observer.dep().notify();
    }
}

/// A valid index as a splice start; `splice` clamps it to the length.
fn splice_start(index: usize) -> isize {
    isize::try_from(index).unwrap_or(isize::MAX)
}

/// The object's observer, unless the object is an instance or root data.
fn ensure_not_root(
    object: &ReactiveObject,
    diagnostic: impl FnOnce() -> Diagnostic,
) -> Result<Option<Arc<Observer>>, Diagnostic> {
    let observer = object.observer();
    let is_root = observer.as_ref().is_some_and(|o| o.vm_count() > 0);
    if object.is_instance() || is_root {
        return Err(diagnostic());
    }
    Ok(observer)
}
