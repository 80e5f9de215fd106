//! Watcher Implementation
//!
//! A Watcher is the bundled [`Subscriber`]: it evaluates a getter inside a
//! reactive context, remembers every dependency the getter read, and
//! re-runs when any of them notifies.
//!
//! # How Watchers Work
//!
//! 1. Each evaluation pushes the watcher as the active reader, runs the
//!    getter, and pops it again (even if the getter panics).
//!
//! 2. Reads during the evaluation call `add_dep`. A dependency read many
//!    times in one evaluation is linked only once.
//!
//! 3. After the evaluation, dependencies that were read last time but not
//!    this time are unsubscribed.
//!
//! # Lazy Watchers
//!
//! A lazy watcher behaves like a computed value: `update()` only marks it
//! dirty and the getter re-runs on the next [`Watcher::read`]. Reading a
//! lazy watcher from inside another evaluation re-publishes its
//! dependencies to the outer reader, so the outer reader is notified
//! directly by the underlying slots.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::context::{self, ReactiveContext};
use super::dep::DepId;
use super::traverse::traverse;
use super::{Dep, Subscriber, SubscriberId};
use crate::value::Value;

type Getter = Box<dyn Fn() -> Value + Send + Sync>;
type Callback = Box<dyn Fn(&Value, &Value) + Send + Sync>;

/// Evaluation options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherOptions {
    /// Defer evaluation until read; `update()` only marks dirty.
    pub lazy: bool,
    /// Depend on every nested slot of the produced value.
    pub deep: bool,
}

struct WatcherState {
    value: Value,
    deps: IndexMap<DepId, Dep>,
    new_deps: IndexMap<DepId, Dep>,
    dirty: bool,
    active: bool,
    run_count: usize,
}

/// A subscriber that re-evaluates a getter when its dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let state = Value::from(serde_json::json!({ "count": 0 }));
/// observe(&state, true);
///
/// let object = state.as_object().unwrap().clone();
/// let watcher = Watcher::new(move || object.get("count"));
///
/// set(&state, "count", Value::from(5));  // watcher re-runs
/// ```
pub struct Watcher {
    id: SubscriberId,
    this: Weak<Watcher>,
    getter: Getter,
    callback: Option<Callback>,
    options: WatcherOptions,
    state: Mutex<WatcherState>,
}

impl Watcher {
    /// Create an eager watcher and evaluate it immediately.
    pub fn new<F>(getter: F) -> Arc<Self>
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self::build(Box::new(getter), None, WatcherOptions::default())
    }

    /// Create a watcher with explicit options.
    pub fn with_options<F>(getter: F, options: WatcherOptions) -> Arc<Self>
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self::build(Box::new(getter), None, options)
    }

    /// Create a watcher that calls `callback(new, old)` after each re-run
    /// that produced a different value (or any container, or when deep).
    pub fn with_callback<F, C>(getter: F, callback: C, options: WatcherOptions) -> Arc<Self>
    where
        F: Fn() -> Value + Send + Sync + 'static,
        C: Fn(&Value, &Value) + Send + Sync + 'static,
    {
        Self::build(Box::new(getter), Some(Box::new(callback)), options)
    }

    fn build(getter: Getter, callback: Option<Callback>, options: WatcherOptions) -> Arc<Self> {
        let watcher = Arc::new_cyclic(|this| Self {
            id: SubscriberId::new(),
            this: this.clone(),
            getter,
            callback,
            options,
            state: Mutex::new(WatcherState {
                value: Value::Undefined,
                deps: IndexMap::new(),
                new_deps: IndexMap::new(),
                dirty: options.lazy,
                active: true,
                run_count: 0,
            }),
        });

        if !options.lazy {
            let value = watcher.get();
            watcher.state.lock().value = value;
        }

        watcher
    }

    /// Get the subscriber ID for this watcher.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Evaluate the getter and re-collect dependencies.
    pub fn get(&self) -> Value {
        let target = self
            .this
            .upgrade()
            .map(|this| this as Arc<dyn Subscriber>);

        let value = {
            let _ctx = ReactiveContext::enter(target);
            let value = (self.getter)();
            if self.options.deep {
                traverse(&value);
            }
            value
        };

        self.cleanup_deps();
        self.state.lock().run_count += 1;
        tracing::trace!(watcher = self.id.raw(), "evaluated");
        value
    }

    /// Swap in the dependencies collected by the last evaluation and
    /// unsubscribe from the ones that were not read again.
    fn cleanup_deps(&self) {
        let stale: Vec<Dep> = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let stale = state
                .deps
                .iter()
                .filter(|(id, _)| !state.new_deps.contains_key(*id))
                .map(|(_, dep)| dep.clone())
                .collect();
            state.deps = std::mem::take(&mut state.new_deps);
            stale
        };

        for dep in stale {
            dep.remove_sub(self.id);
        }
    }

    /// Re-evaluate and fire the callback when warranted.
    pub fn run(&self) {
        if !self.is_active() {
            return;
        }

        let value = self.get();
        let old = std::mem::replace(&mut self.state.lock().value, value.clone());

        if !value.strict_eq(&old) || value.is_container() || self.options.deep {
            if let Some(callback) = &self.callback {
                callback(&value, &old);
            }
        }
    }

    /// Recompute a lazy watcher and clear its dirty flag.
    pub fn evaluate(&self) -> Value {
        let value = self.get();
        let mut state = self.state.lock();
        state.value = value.clone();
        state.dirty = false;
        value
    }

    /// Read the watcher's value as a computed value: recompute if dirty,
    /// then link the active reader to everything this watcher depends on.
    pub fn read(&self) -> Value {
        let value = if self.is_dirty() {
            self.evaluate()
        } else {
            self.value()
        };

        if context::is_tracking() {
            self.depend();
        }
        value
    }

    /// Make the active reader depend on all of this watcher's dependencies.
    pub fn depend(&self) {
        let deps: Vec<Dep> = self.state.lock().deps.values().cloned().collect();
        for dep in deps {
            dep.depend();
        }
    }

    /// Unsubscribe from every dependency and stop reacting.
    pub fn teardown(&self) {
        let deps: Vec<Dep> = {
            let mut state = self.state.lock();
            if !state.active {
                return;
            }
            state.active = false;
            state.deps.drain(..).map(|(_, dep)| dep).collect()
        };

        for dep in deps {
            dep.remove_sub(self.id);
        }
    }

    /// The last computed value.
    pub fn value(&self) -> Value {
        self.state.lock().value.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Get the number of times the getter has been evaluated.
    pub fn run_count(&self) -> usize {
        self.state.lock().run_count
    }

    /// Get the number of dependencies.
    pub fn dependency_count(&self) -> usize {
        self.state.lock().deps.len()
    }

    /// Whether the last evaluation read `dep`.
    pub fn depends_on(&self, dep: &Dep) -> bool {
        self.state.lock().deps.contains_key(&dep.id())
    }
}

impl Subscriber for Watcher {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(self: Arc<Self>, dep: &Dep) {
        let subscribe = {
            let mut state = self.state.lock();
            if state.new_deps.contains_key(&dep.id()) {
                false
            } else {
                state.new_deps.insert(dep.id(), dep.clone());
                !state.deps.contains_key(&dep.id())
            }
        };

        if subscribe {
            dep.add_sub(&(self as Arc<dyn Subscriber>));
        }
    }

    fn update(&self) {
        if self.options.lazy {
            self.state.lock().dirty = true;
        } else {
            self.run();
        }
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("run_count", &state.run_count)
            .field("dependency_count", &state.deps.len())
            .field("dirty", &state.dirty)
            .field("active", &state.active)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
