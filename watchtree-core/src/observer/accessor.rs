//! Reactive slots.
//!
//! A reactive slot replaces one object property. It keeps the value (or
//! the property's original accessors), the observer of the held value, and
//! the dependency for the property.
//!
//! # Reads
//!
//! With an active reader, a read links the slot's dependency. If the held
//! value is observed, its observer's dependency is linked too, so the
//! reader hears about structural changes of the held container. For arrays
//! every element's observer is linked as well: element-level precision is
//! not attempted.
//!
//! # Writes
//!
//! A write that is strictly equal to the current value (or NaN over NaN)
//! does nothing. Otherwise the value is stored, observed, and the slot's
//! dependency notifies.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::object::{Getter, ReactiveObject, Setter, Slot};
use super::{observe, Observer, ReactiveArray};
use crate::reactive::{is_tracking, untracked, Dep};
use crate::value::Value;

/// Hook invoked with the incoming value before a non-no-op write.
pub type CustomSetter = Arc<dyn Fn(&Value) + Send + Sync>;

/// Options for [`define_reactive`].
#[derive(Clone, Default)]
pub struct DefineOptions {
    /// Initial value. When absent the property's current value is used.
    pub initial: Option<Value>,
    /// Do not observe held values.
    pub shallow: bool,
    pub custom_setter: Option<CustomSetter>,
}

impl DefineOptions {
    pub fn with_value(value: Value) -> Self {
        Self {
            initial: Some(value),
            ..Self::default()
        }
    }
}

struct SlotState {
    value: Value,
    child_observer: Option<Arc<Observer>>,
}

pub(crate) struct ReactiveSlot {
    dep: Dep,
    state: Mutex<SlotState>,
    getter: Option<Getter>,
    setter: Option<Setter>,
    shallow: bool,
    custom_setter: Option<CustomSetter>,
}

impl ReactiveSlot {
    pub(crate) fn dep(&self) -> &Dep {
        &self.dep
    }

    pub(crate) fn get(&self) -> Value {
        let (cached, child) = {
            let state = self.state.lock();
            (state.value.clone(), state.child_observer.clone())
        };
        let value = match &self.getter {
            Some(getter) => getter(),
            None => cached,
        };

        if is_tracking() {
            self.dep.depend();
            if let Some(child) = child {
                child.dep().depend();
                if let Value::Array(array) = &value {
                    depend_array(array);
                }
            }
        }
        value
    }

    pub(crate) fn set(&self, new: Value) {
        let current = match &self.getter {
            Some(getter) => getter(),
            None => self.state.lock().value.clone(),
        };
        if current.same_value_for_write(&new) {
            return;
        }
        if let Some(hook) = &self.custom_setter {
            hook(&new);
        }
        // Accessor without setter: read-only passthrough.
        if self.getter.is_some() && self.setter.is_none() {
            return;
        }

        match &self.setter {
            Some(setter) => setter(new.clone()),
            None => self.state.lock().value = new.clone(),
        }

        let child = if self.shallow {
            None
        } else {
            observe(&new, false)
        };
        self.state.lock().child_observer = child;
        self.dep.notify();
    }
}

/// Link the active reader to the observer of every element, recursively.
fn depend_array(array: &ReactiveArray) {
    let mut seen = HashSet::new();
    depend_array_inner(array, &mut seen);
}

fn depend_array_inner(array: &ReactiveArray, seen: &mut HashSet<usize>) {
    if !seen.insert(array.addr()) {
        return;
    }
    for item in array.to_vec() {
        if let Some(observer) = item.observer() {
            observer.dep().depend();
        }
        if let Value::Array(nested) = &item {
            depend_array_inner(nested, seen);
        }
    }
}

/// Replace `object[key]` with a reactive slot.
///
/// Returns false and leaves the property untouched when it is not
/// configurable, or when the key is absent and the object is not
/// extensible. Existing accessors are preserved: reads go through the
/// original getter and writes through the original setter.
pub fn define_reactive(object: &ReactiveObject, key: &str, options: DefineOptions) -> bool {
    let existing = object.slot(key);
    if existing.as_ref().is_some_and(|slot| !slot.is_configurable()) {
        return false;
    }

    let (getter, setter, current): (Option<Getter>, Option<Setter>, Value) = match existing {
        None => (None, None, Value::Undefined),
        Some(Slot::Data { value, .. }) => (None, None, value),
        Some(Slot::Accessor { getter, setter, .. }) => (getter, setter, Value::Undefined),
        Some(Slot::Reactive(previous)) => {
            let read = previous.clone();
            let write = previous;
            (
                Some(Arc::new(move || read.get()) as Getter),
                Some(Arc::new(move |value: Value| write.set(value)) as Setter),
                Value::Undefined,
            )
        }
    };

    let value = match options.initial {
        Some(initial) => initial,
        None if getter.is_none() => current,
        None if setter.is_some() => {
            untracked(|| getter.as_ref().map(|g| g()).unwrap_or_default())
        }
        None => Value::Undefined,
    };

    let child_observer = if options.shallow {
        None
    } else {
        observe(&value, false)
    };

    let slot = ReactiveSlot {
        dep: Dep::new(),
        state: Mutex::new(SlotState {
            value,
            child_observer,
        }),
        getter,
        setter,
        shallow: options.shallow,
        custom_setter: options.custom_setter,
    };
    object.install_slot(key, Slot::Reactive(Arc::new(slot)))
}
