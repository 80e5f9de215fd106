//! Dependency
//!
//! A `Dep` is the publish/subscribe list for one reactive slot, or for one
//! container's structural changes. Reading the slot calls [`Dep::depend`];
//! writing it calls [`Dep::notify`].
//!
//! # Reentrancy
//!
//! A subscriber's `update()` may read or write the very dependency that is
//! notifying it. `notify` therefore snapshots the subscriber list and
//! releases the lock before delivering anything.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::context;
use super::{Subscriber, SubscriberId};
use crate::config;

/// Counter for generating unique dependency IDs.
static DEP_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique, creation-ordered identifier for a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        Self(DEP_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

struct DepInner {
    id: DepId,
    /// Non-owning; most slots have a handful of readers.
    subs: Mutex<SmallVec<[Weak<dyn Subscriber>; 4]>>,
}

/// A shared handle to one dependency.
#[derive(Clone)]
pub struct Dep {
    inner: Arc<DepInner>,
}

impl Dep {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DepInner {
                id: DepId::next(),
                subs: Mutex::new(SmallVec::new()),
            }),
        }
    }

    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Append a subscriber.
    pub fn add_sub(&self, sub: &Arc<dyn Subscriber>) {
        self.inner.subs.lock().push(Arc::downgrade(sub));
    }

    /// Remove the first entry for subscriber `id`.
    ///
    /// Entries whose subscriber has been dropped are pruned on the way.
    pub fn remove_sub(&self, id: SubscriberId) {
        let mut subs = self.inner.subs.lock();
        subs.retain(|weak| weak.strong_count() > 0);
        if let Some(pos) = subs
            .iter()
            .position(|weak| weak.upgrade().is_some_and(|s| s.id() == id))
        {
            subs.remove(pos);
        }
    }

    /// Link this dependency to the active reader, if there is one.
    pub fn depend(&self) {
        if let Some(target) = context::current_target() {
            target.add_dep(self);
        }
    }

    /// Deliver `update()` to every subscriber.
    ///
    /// Unless updates are batched by an external scheduler, subscribers
    /// fire in ascending creation order.
    pub fn notify(&self) {
        let mut subs: Vec<Arc<dyn Subscriber>> = self
            .inner
            .subs
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();

        if !config::with(|c| c.batched) {
            subs.sort_by_key(|s| s.id());
        }

        tracing::trace!(dep = self.id().raw(), subscribers = subs.len(), "notify");

        for sub in subs {
            sub.update();
        }
    }

    /// Number of live subscribers.
    pub fn sub_count(&self) -> usize {
        self.inner
            .subs
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Whether the live subscribers include `id`.
    pub fn has_sub(&self, id: SubscriberId) -> bool {
        self.inner
            .subs
            .lock()
            .iter()
            .any(|weak| weak.upgrade().is_some_and(|s| s.id() == id))
    }

    pub fn ptr_eq(&self, other: &Dep) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.inner.id)
            .field("subscriber_count", &self.sub_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
