//! Reactive Primitives
//!
//! This module implements the dependency-tracking half of the engine:
//! dependencies, the active-reader context, and the subscribers that
//! consume them.
//!
//! # Concepts
//!
//! ## Dependencies
//!
//! A [`Dep`] is a list of subscribers interested in one slot or one
//! container's shape. Reading the slot links the active reader to the
//! dependency; writing it notifies every linked subscriber synchronously.
//!
//! ## Active Reader
//!
//! The reactive context is a thread-local stack naming the subscriber that
//! is currently evaluating. Pushing and popping are paired by the
//! [`ReactiveContext`] guard.
//!
//! ## Subscribers
//!
//! Anything implementing [`Subscriber`] can be linked. [`Watcher`] is the
//! bundled implementation with per-evaluation de-duplication and cleanup.

mod context;
mod dep;
mod subscriber;
mod traverse;
mod watcher;

pub use context::{
    current_target, depth, is_tracking, pop_target, push_target, untracked, ReactiveContext,
};
pub use dep::{Dep, DepId};
pub use subscriber::{Subscriber, SubscriberId};
pub use watcher::{Watcher, WatcherOptions};
