//! Reactive objects.
//!
//! An object is an ordered map from key to slot. A slot is plain data, a
//! user-defined accessor pair, or a reactive slot installed by
//! observation. Ordinary reads and writes go through [`ReactiveObject::get`]
//! and [`ReactiveObject::assign`], which dispatch on the slot kind, so a
//! reactive slot behaves exactly like the data it replaced except that it
//! tracks and notifies.
//!
//! Keys added by `assign` after observation are plain slots and are not
//! reactive; use [`set`](super::set) to add a reactive key.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use super::accessor::ReactiveSlot;
use super::Observer;
use crate::reactive::Dep;
use crate::value::Value;

/// A user-supplied read accessor.
pub type Getter = Arc<dyn Fn() -> Value + Send + Sync>;

/// A user-supplied write accessor.
pub type Setter = Arc<dyn Fn(Value) + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Slot {
    Data {
        value: Value,
        configurable: bool,
    },
    Accessor {
        getter: Option<Getter>,
        setter: Option<Setter>,
        configurable: bool,
    },
    Reactive(Arc<ReactiveSlot>),
}

impl Slot {
    pub(crate) fn is_configurable(&self) -> bool {
        match self {
            Slot::Data { configurable, .. } | Slot::Accessor { configurable, .. } => *configurable,
            Slot::Reactive(_) => true,
        }
    }
}

struct ObjectInner {
    slots: RwLock<IndexMap<Arc<str>, Slot>>,
    /// Hidden observer marker.
    observer: Mutex<Option<Arc<Observer>>>,
    extensible: AtomicBool,
    instance: AtomicBool,
}

/// A shared handle to an object.
#[derive(Clone)]
pub struct ReactiveObject {
    inner: Arc<ObjectInner>,
}

impl ReactiveObject {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                slots: RwLock::new(IndexMap::new()),
                observer: Mutex::new(None),
                extensible: AtomicBool::new(true),
                instance: AtomicBool::new(false),
            }),
        }
    }

    /// Build an object of plain data slots.
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<Arc<str>>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let object = Self::new();
        {
            let mut slots = object.inner.slots.write();
            for (key, value) in entries {
                slots.insert(
                    key.into(),
                    Slot::Data {
                        value,
                        configurable: true,
                    },
                );
            }
        }
        object
    }

    /// Read a property. Absent keys read as `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        // The guard must be released before running any accessor.
        let slot = self.slot(key);
        match slot {
            None => Value::Undefined,
            Some(Slot::Data { value, .. }) => value,
            Some(Slot::Accessor { getter, .. }) => getter.map(|g| g()).unwrap_or_default(),
            Some(Slot::Reactive(reactive)) => reactive.get(),
        }
    }

    /// Write a property the ordinary way.
    ///
    /// Reactive slots notify; accessor slots without a setter drop the
    /// write. An absent key becomes a plain slot if the object is
    /// extensible.
    pub fn assign(&self, key: &str, value: Value) {
        let slot = self.slot(key);
        match slot {
            Some(Slot::Reactive(reactive)) => reactive.set(value),
            Some(Slot::Accessor { setter, .. }) => {
                if let Some(setter) = setter {
                    setter(value);
                }
            }
            Some(Slot::Data { .. }) => {
                if let Some(Slot::Data { value: current, .. }) =
                    self.inner.slots.write().get_mut(key)
                {
                    *current = value;
                }
            }
            None => {
                if self.is_extensible() {
                    self.inner.slots.write().insert(
                        key.into(),
                        Slot::Data {
                            value,
                            configurable: true,
                        },
                    );
                }
            }
        }
    }

    /// Delete a property the ordinary way.
    ///
    /// Returns false only when the property exists and is not configurable.
    pub fn remove(&self, key: &str) -> bool {
        let mut slots = self.inner.slots.write();
        match slots.get(key).map(Slot::is_configurable) {
            Some(false) => false,
            Some(true) => {
                slots.shift_remove(key);
                true
            }
            None => true,
        }
    }

    /// Define a data property with an explicit `configurable` flag.
    ///
    /// Returns false if the key exists and is not configurable, or is
    /// absent and the object is not extensible.
    pub fn define_property(&self, key: &str, value: Value, configurable: bool) -> bool {
        self.install_slot(key, Slot::Data { value, configurable })
    }

    /// Define an accessor property.
    pub fn define_accessor(
        &self,
        key: &str,
        getter: Option<Getter>,
        setter: Option<Setter>,
        configurable: bool,
    ) -> bool {
        self.install_slot(
            key,
            Slot::Accessor {
                getter,
                setter,
                configurable,
            },
        )
    }

    pub(crate) fn install_slot(&self, key: &str, slot: Slot) -> bool {
        let mut slots = self.inner.slots.write();
        match slots.get(key).map(Slot::is_configurable) {
            Some(false) => false,
            Some(true) => {
                slots.insert(key.into(), slot);
                true
            }
            None if self.is_extensible() => {
                slots.insert(key.into(), slot);
                true
            }
            None => false,
        }
    }

    pub(crate) fn slot(&self, key: &str) -> Option<Slot> {
        self.inner.slots.read().get(key).cloned()
    }

    /// The dependency of a reactive slot, if `key` holds one.
    pub fn slot_dep(&self, key: &str) -> Option<Dep> {
        match self.slot(key)? {
            Slot::Reactive(reactive) => Some(reactive.dep().clone()),
            _ => None,
        }
    }

    /// Whether `key` holds a reactive slot.
    pub fn is_reactive(&self, key: &str) -> bool {
        matches!(self.slot(key), Some(Slot::Reactive(_)))
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.inner.slots.read().contains_key(key)
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> Vec<Arc<str>> {
        self.inner.slots.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forbid adding new keys.
    pub fn prevent_extensions(&self) {
        self.inner.extensible.store(false, Ordering::Relaxed);
    }

    pub fn is_extensible(&self) -> bool {
        self.inner.extensible.load(Ordering::Relaxed)
    }

    /// Flag this object as a root instance; instances are never observed.
    pub fn mark_instance(&self) {
        self.inner.instance.store(true, Ordering::Relaxed);
    }

    pub fn is_instance(&self) -> bool {
        self.inner.instance.load(Ordering::Relaxed)
    }

    /// The observer recorded in the hidden marker.
    pub fn observer(&self) -> Option<Arc<Observer>> {
        self.inner.observer.lock().clone()
    }

    pub(crate) fn set_observer(&self, observer: Arc<Observer>) {
        *self.inner.observer.lock() = Some(observer);
    }

    pub fn ptr_eq(&self, other: &ReactiveObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl Default for ReactiveObject {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Contents are omitted: they may be cyclic and reading them could track.
        f.debug_struct("ReactiveObject")
            .field("keys", &self.keys())
            .field("observed", &self.observer().is_some())
            .finish()
    }
}
