//! Subscriber types for the reactive system.
//!
//! A Subscriber is any consumer that reads observed data and wants to be
//! told when that data changes: render functions, watchers, computed values.
//! This module only defines the capability the dependency layer relies on;
//! [`Watcher`](super::Watcher) is the bundled implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::Dep;

/// Unique identifier for a subscriber.
///
/// IDs are handed out in creation order, so comparing two IDs tells which
/// subscriber was created first. Notification delivers in ascending ID
/// order, which updates structurally higher consumers (created earlier)
/// before the ones they created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A consumer of dependencies.
///
/// Dependencies keep only weak references to their subscribers; the owner
/// of a subscriber keeps it alive and is responsible for unsubscribing it.
pub trait Subscriber: Send + Sync {
    /// Creation-ordered identity.
    fn id(&self) -> SubscriberId;

    /// Called by [`Dep::depend`] while this subscriber is the active reader.
    ///
    /// Implementations record `dep` and call [`Dep::add_sub`] to complete
    /// the link. De-duplication is the implementation's job.
    fn add_dep(self: Arc<Self>, dep: &Dep);

    /// Called synchronously when a dependency this subscriber joined changes.
    fn update(&self);
}
