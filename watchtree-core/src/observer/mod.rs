//! Observation
//!
//! This module turns plain containers into observed ones.
//!
//! # Overview
//!
//! [`observe`] attaches an [`Observer`] to an object or array. The observer
//! owns a [`Dep`] that stands for "this container changed shape", and a
//! count of consumers that use the container as root data.
//!
//! - Objects get a reactive slot for every own key (see [`define_reactive`]).
//! - Arrays are observed element by element; their seven mutators notify
//!   the observer's dependency (see [`ReactiveArray`]).
//!
//! The observer is recorded in a hidden marker on the container, so a
//! second `observe` of the same value returns the same observer and key
//! enumeration never sees it.
//!
//! # Switches
//!
//! Observation can be suspended with [`toggle_observing`], and is skipped
//! while the configuration is in server-rendering mode. Callers can inject
//! a predicate that excludes whole categories of values.

mod accessor;
mod api;
mod array;
mod object;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config;
use crate::reactive::Dep;
use crate::value::Value;

pub use accessor::{define_reactive, CustomSetter, DefineOptions};
pub use api::{del, set};
pub use array::ReactiveArray;
pub use object::{Getter, ReactiveObject, Setter};

type ExcludedPredicate = Rc<dyn Fn(&Value) -> bool>;

thread_local! {
    static SHOULD_OBSERVE: Cell<bool> = const { Cell::new(true) };
    static EXCLUDED: RefCell<Option<ExcludedPredicate>> = const { RefCell::new(None) };
}

/// Enable or disable creation of new observers.
///
/// Existing observers keep working; only `observe` of fresh values is
/// affected.
pub fn toggle_observing(enabled: bool) {
    tracing::debug!(enabled, "observation toggled");
    SHOULD_OBSERVE.with(|flag| flag.set(enabled));
}

/// Whether `observe` currently creates new observers.
pub fn should_observe() -> bool {
    SHOULD_OBSERVE.with(Cell::get)
}

/// Install the predicate naming values that must never be observed.
pub fn set_excluded_predicate<F>(predicate: F)
where
    F: Fn(&Value) -> bool + 'static,
{
    EXCLUDED.with(|slot| *slot.borrow_mut() = Some(Rc::new(predicate)));
}

/// Remove the excluded-value predicate.
pub fn clear_excluded_predicate() {
    EXCLUDED.with(|slot| slot.borrow_mut().take());
}

pub(crate) fn is_excluded(value: &Value) -> bool {
    let predicate = EXCLUDED.with(|slot| slot.borrow().clone());
    predicate.is_some_and(|p| p(value))
}

/// Per-container observation record.
pub struct Observer {
    dep: Dep,
    vm_count: AtomicUsize,
}

impl Observer {
    /// Attach a new observer to `value` and instrument its contents.
    ///
    /// The marker is set before walking so cyclic data terminates.
    fn attach(value: &Value) -> Arc<Observer> {
        let observer = Arc::new(Observer {
            dep: Dep::new(),
            vm_count: AtomicUsize::new(0),
        });

        match value {
            Value::Object(object) => {
                object.set_observer(observer.clone());
                Self::walk(object);
            }
            Value::Array(array) => {
                array.set_observer(observer.clone());
                Self::observe_items(&array.to_vec());
            }
            _ => {}
        }

        tracing::trace!(
            dep = observer.dep.id().raw(),
            kind = value.type_name(),
            "observer attached"
        );
        observer
    }

    /// Install a reactive slot for every own key of `object`.
    fn walk(object: &ReactiveObject) {
        for key in object.keys() {
            define_reactive(object, &key, DefineOptions::default());
        }
    }

    /// Observe each item.
    pub(crate) fn observe_items(items: &[Value]) {
        for item in items {
            observe(item, false);
        }
    }

    /// The dependency notified on structural change.
    pub fn dep(&self) -> &Dep {
        &self.dep
    }

    /// How many consumers use this container as root data.
    pub fn vm_count(&self) -> usize {
        self.vm_count.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("dep", &self.dep)
            .field("vm_count", &self.vm_count())
            .finish()
    }
}

/// Bring `value` under observation.
///
/// Returns `None` for anything that is not an object or array, for
/// excluded values, and when observation is currently not allowed for a
/// fresh value. A value that is already observed returns its existing
/// observer. With `as_root_data` the observer's root count is incremented.
pub fn observe(value: &Value, as_root_data: bool) -> Option<Arc<Observer>> {
    if !value.is_container() || is_excluded(value) {
        return None;
    }

    let observer = match value.observer() {
        Some(existing) => existing,
        None if can_attach(value) => Observer::attach(value),
        None => return None,
    };

    if as_root_data {
        observer.vm_count.fetch_add(1, Ordering::Relaxed);
    }
    Some(observer)
}

fn can_attach(value: &Value) -> bool {
    if !should_observe() || config::with(|c| c.server_rendering) {
        return false;
    }
    match value {
        Value::Object(object) => object.is_extensible() && !object.is_instance(),
        Value::Array(array) => array.is_extensible(),
        _ => false,
    }
}
